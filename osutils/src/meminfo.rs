use anyhow::{Context, Error};
use log::debug;
use procfs::{Current, Meminfo};

use layoutcheck_api::{constants::MEMORY_ROUNDING_BLOCK, primitives::bytes::ByteCount};

/// Memory installed in the machine.
///
/// `MemTotal` does not count memory taken by the kernel image, so it is
/// always a little less than what is installed. The value is rounded up to
/// the next 128 MiB boundary to compensate.
pub fn total_memory() -> Result<ByteCount, Error> {
    let meminfo = Meminfo::current().context("Failed to read /proc/meminfo")?;
    let total = round_up_memory(ByteCount(meminfo.mem_total));
    debug!(
        "MemTotal is {}, assuming {total} installed",
        ByteCount(meminfo.mem_total)
    );
    Ok(total)
}

/// Rounds up to the next multiple of the rounding block, strictly above
/// `mem_total`.
pub fn round_up_memory(mem_total: ByteCount) -> ByteCount {
    let block = MEMORY_ROUNDING_BLOCK.bytes();
    ByteCount((mem_total.bytes() / block + 1) * block)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_up_memory() {
        let mib = |n| ByteCount::from_mib(n);
        assert_eq!(round_up_memory(mib(1000)), mib(1024));
        assert_eq!(round_up_memory(mib(1)), mib(128));
        // Exact multiples still move up a block
        assert_eq!(round_up_memory(mib(1024)), mib(1152));
        assert_eq!(round_up_memory(ByteCount(0)), mib(128));
    }

    #[test]
    fn test_total_memory() {
        let total = total_memory().unwrap();
        assert_eq!(total.bytes() % MEMORY_ROUNDING_BLOCK.bytes(), 0);
        assert!(total > ByteCount(0));
    }
}
