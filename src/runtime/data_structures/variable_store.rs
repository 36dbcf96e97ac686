/// The memory behind `VARIABLE` words.  Each variable owns one cell, addressed by its index in the
/// store.  Released cells are reused by later allocations, but a live cell is never handed out
/// twice.
#[derive(Default)]
pub struct VariableStore {
    cells: Vec<Option<i32>>,
    free: Vec<usize>,
}

impl VariableStore {
    pub fn new() -> VariableStore {
        VariableStore {
            cells: Vec::new(),
            free: Vec::new(),
        }
    }

    /// Allocate a new cell initialised to zero and return its address.
    pub fn allocate(&mut self) -> usize {
        match self.free.pop() {
            Some(address) => {
                self.cells[address] = Some(0);
                address
            }

            None => {
                self.cells.push(Some(0));
                self.cells.len() - 1
            }
        }
    }

    /// Give a cell back to the store.  Releasing an address that is not live does nothing.
    pub fn release(&mut self, address: usize) {
        if let Some(cell) = self.cells.get_mut(address)
            && cell.is_some()
        {
            *cell = None;
            self.free.push(address);
        }
    }

    /// Read a live cell.
    pub fn read(&self, address: usize) -> Option<i32> {
        self.cells.get(address).copied().flatten()
    }

    /// Write a live cell, returns false if the address isn't live.
    pub fn write(&mut self, address: usize, value: i32) -> bool {
        match self.cells.get_mut(address) {
            Some(Some(cell)) => {
                *cell = value;
                true
            }

            _ => false,
        }
    }

    pub fn is_live(&self, address: usize) -> bool {
        self.read(address).is_some()
    }

    /// How many cells are currently allocated.
    pub fn live_count(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn released_cells_are_reused_but_live_ones_are_not() {
        let mut store = VariableStore::new();

        let a = store.allocate();
        let b = store.allocate();
        assert_ne!(a, b);

        store.release(a);
        assert!(!store.is_live(a));
        assert!(!store.write(a, 5));

        let c = store.allocate();
        assert_eq!(c, a);
        assert_ne!(c, b);
        assert_eq!(store.read(c), Some(0));
        assert_eq!(store.live_count(), 2);
    }

    #[test]
    fn double_release_does_not_duplicate_free_slots() {
        let mut store = VariableStore::new();

        let a = store.allocate();
        store.release(a);
        store.release(a);

        let b = store.allocate();
        let c = store.allocate();
        assert_ne!(b, c);
    }
}
