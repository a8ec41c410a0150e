//! Run the full randomized accuracy and timing self-test.
//!
//! Prints one line per trial with the segment populations and wall-clock.
//! Set `RUST_LOG=warn` to surface breakdown diagnostics, should any occur.

use std::io;

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    lcp_core::selftest::test_solve_lcp(&mut out)?;
    println!("all trials passed");
    Ok(())
}
