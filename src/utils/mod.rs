// Byte-level helpers shared by the tag codec and the patcher
pub mod encoding;
pub mod io;
pub mod unsync;
