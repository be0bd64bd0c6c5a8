//! Field flags (`/Ff`) that change how a value is written

use bitflags::bitflags;

bitflags! {
    /// Subset of the field flag bits the filler acts on.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct FieldFlags: u32 {
        /// Bit 1: user cannot change the value
        const READ_ONLY = 1 << 0;
        /// Bit 13 (Tx): text may span several lines
        const MULTILINE = 1 << 12;
        /// Bit 14 (Tx): text is shown as asterisks
        const PASSWORD = 1 << 13;
        /// Bit 15 (Btn): radio group cannot be switched off
        const NO_TOGGLE_TO_OFF = 1 << 14;
        /// Bit 16 (Btn): radio button rather than checkbox
        const RADIO = 1 << 15;
        /// Bit 17 (Btn): push button
        const PUSHBUTTON = 1 << 16;
        /// Bit 18 (Ch): combo box rather than list box
        const COMBO = 1 << 17;
        /// Bit 19 (Ch): combo box accepts values outside its options
        const EDIT = 1 << 18;
    }
}

impl FieldFlags {
    /// Read a raw `/Ff` integer, ignoring bits this crate does not use
    pub fn from_raw(raw: i64) -> Self {
        Self::from_bits_truncate(raw as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_raw_keeps_known_bits() {
        let flags = FieldFlags::from_raw((1 << 15) | (1 << 14) | (1 << 27));
        assert!(flags.contains(FieldFlags::RADIO));
        assert!(flags.contains(FieldFlags::NO_TOGGLE_TO_OFF));
        assert!(!flags.contains(FieldFlags::PUSHBUTTON));
    }
}
