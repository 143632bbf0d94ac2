use crate::image::Image;

/// Number of general-purpose registers (`r0..r15`).
pub const REGISTER_COUNT: usize = 16;
/// Number of memory cells.
pub const MEMORY_WORDS: usize = 256;

/// One memory cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Cell {
    /// Instruction cell from the image; `None` when the line was malformed.
    Code(Option<u16>),
    /// Data cell holding a signed 16-bit value.
    Data(i16),
}

impl Default for Cell {
    fn default() -> Self {
        Self::Data(0)
    }
}

/// Complete state of one machine run.
///
/// Instructions live in `[0, code_size)`, data in `[code_size, 256)`.
/// Register 0 always reads as zero.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct MachineState {
    registers: [i16; REGISTER_COUNT],
    memory: Box<[Cell]>,
    pc: usize,
    code_size: usize,
    halted: bool,
}

impl MachineState {
    /// Fresh state with `image` loaded at address 0.
    ///
    /// Words beyond the memory size are ignored; [`crate::read_image`]
    /// never produces such images.
    #[must_use]
    pub fn from_image(image: &Image) -> Self {
        let mut memory = vec![Cell::default(); MEMORY_WORDS].into_boxed_slice();
        for (cell, word) in memory.iter_mut().zip(image.words()) {
            *cell = Cell::Code(*word);
        }
        Self {
            registers: [0; REGISTER_COUNT],
            memory,
            pc: 0,
            code_size: image.code_size().min(MEMORY_WORDS),
            halted: false,
        }
    }

    /// Reads a register; register 0 is always zero.
    #[must_use]
    pub fn register(&self, index: usize) -> i16 {
        if index == 0 {
            0
        } else {
            self.registers.get(index).copied().unwrap_or(0)
        }
    }

    /// Writes a register. Writes to register 0 are discarded at the end of
    /// the instruction.
    pub fn set_register(&mut self, index: usize, value: i16) {
        if let Some(slot) = self.registers.get_mut(index) {
            *slot = value;
        }
    }

    /// Snapshot of all registers as seen by the program.
    #[must_use]
    pub fn registers(&self) -> [i16; REGISTER_COUNT] {
        let mut out = self.registers;
        out[0] = 0;
        out
    }

    /// Address of the next instruction to fetch.
    #[must_use]
    pub const fn pc(&self) -> usize {
        self.pc
    }

    pub(crate) const fn set_pc(&mut self, pc: usize) {
        self.pc = pc;
    }

    pub(crate) const fn advance_pc(&mut self) {
        self.pc += 1;
    }

    /// Number of instruction cells.
    #[must_use]
    pub const fn code_size(&self) -> usize {
        self.code_size
    }

    /// Whether `halt` has executed.
    #[must_use]
    pub const fn is_halted(&self) -> bool {
        self.halted
    }

    pub(crate) const fn halt(&mut self) {
        self.halted = true;
    }

    /// Memory cell at `address`, if in range.
    #[must_use]
    pub fn cell(&self, address: usize) -> Option<Cell> {
        self.memory.get(address).copied()
    }

    /// Signed value of a data cell.
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub fn data(&self, address: usize) -> i16 {
        match self.cell(address) {
            Some(Cell::Data(value)) => value,
            Some(Cell::Code(Some(word))) => word as i16,
            Some(Cell::Code(None)) | None => 0,
        }
    }

    pub(crate) fn set_data(&mut self, address: usize, value: i16) {
        if let Some(cell) = self.memory.get_mut(address) {
            *cell = Cell::Data(value);
        }
    }

    /// Whether `target` is a valid instruction address.
    #[must_use]
    pub fn is_code_address(&self, target: i32) -> bool {
        usize::try_from(target).is_ok_and(|t| t < self.code_size)
    }

    /// Whether `target` is a valid data address.
    #[must_use]
    pub fn is_data_address(&self, target: i32) -> bool {
        usize::try_from(target).is_ok_and(|t| (self.code_size..MEMORY_WORDS).contains(&t))
    }

    pub(crate) const fn clear_register_zero(&mut self) {
        self.registers[0] = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with_code(words: usize) -> MachineState {
        MachineState::from_image(&Image::from_words(vec![0_u16; words]))
    }

    #[test]
    fn image_loads_into_code_region() {
        let state = MachineState::from_image(&Image::from_words([0x1105, 0x0000]));
        assert_eq!(state.code_size(), 2);
        assert_eq!(state.cell(0), Some(Cell::Code(Some(0x1105))));
        assert_eq!(state.cell(2), Some(Cell::Data(0)));
        assert_eq!(state.cell(MEMORY_WORDS), None);
        assert_eq!(state.pc(), 0);
        assert!(!state.is_halted());
    }

    #[test]
    fn register_zero_reads_as_zero() {
        let mut state = state_with_code(1);
        state.set_register(0, 42);
        assert_eq!(state.register(0), 0);
        assert_eq!(state.registers()[0], 0);
        state.set_register(7, -3);
        assert_eq!(state.register(7), -3);
    }

    #[test]
    fn region_checks_split_at_code_size() {
        let state = state_with_code(4);
        assert!(state.is_code_address(0));
        assert!(state.is_code_address(3));
        assert!(!state.is_code_address(4));
        assert!(!state.is_code_address(-1));
        assert!(!state.is_data_address(3));
        assert!(state.is_data_address(4));
        assert!(state.is_data_address(255));
        assert!(!state.is_data_address(256));
    }

    #[test]
    fn data_cells_round_trip_signed_values() {
        let mut state = state_with_code(1);
        state.set_data(100, -32768);
        assert_eq!(state.data(100), -32768);
        assert_eq!(state.cell(100), Some(Cell::Data(-32768)));
    }
}
