pub mod catalog;
pub mod devlinks;
pub mod exe;
pub mod firmware;
pub mod lsblk;
pub mod meminfo;
pub mod udevadm;

pub(crate) mod crate_private {
    pub trait Sealed {}
}
