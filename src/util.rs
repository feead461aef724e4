pub mod checksum;
pub mod clock;
