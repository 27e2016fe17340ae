use bitflags::bitflags;

use crate::error::FifoError;

bitflags! {
    /// Backpressure and wake-up policy for a [`Fifo`](crate::sync::fifo::Fifo).
    ///
    /// `BLOCK_NO_INPUT` and `BLOCK_MAX_OUTPUT` are configured on the FIFO
    /// itself via `set_block_flags`; `PULL_NO_BLOCK` and `PULL_POKE` are
    /// call-site flags passed to `pop_flags`/`peek_flags`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct BlockFlags: u32 {
        /// Block pulls when the queue is empty, instead of returning immediately.
        const BLOCK_NO_INPUT = 1 << 0;
        /// Block pushes when the queue is over capacity, instead of returning queue-full.
        const BLOCK_MAX_OUTPUT = 1 << 1;
        /// Never block this particular pull, regardless of `BLOCK_NO_INPUT`.
        const PULL_NO_BLOCK = 1 << 2;
        /// Observe a targeted `poke` as try-again instead of re-entering the wait.
        const PULL_POKE = 1 << 3;
    }
}

/// Parses a comma-separated list of block flag names.
///
/// Accepts exactly the lowercase tokens `block_no_input`, `block_max_output`,
/// and `pull_no_block`, with no surrounding whitespace. Any other token is
/// rejected with [`FifoError::InvalidArgument`].
pub fn string_to_block_flags(s: &str) -> Result<BlockFlags, FifoError> {
    let mut flags = BlockFlags::empty();

    for token in s.split(',') {
        flags |= match token {
            "block_no_input" => BlockFlags::BLOCK_NO_INPUT,
            "block_max_output" => BlockFlags::BLOCK_MAX_OUTPUT,
            "pull_no_block" => BlockFlags::PULL_NO_BLOCK,
            _ => {
                return Err(FifoError::invalid_argument(format!(
                    "unknown block flag: {token}"
                )))
            }
        };
    }

    Ok(flags)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_tokens() {
        let flags = string_to_block_flags("block_no_input,pull_no_block").unwrap();
        assert_eq!(
            flags,
            BlockFlags::BLOCK_NO_INPUT | BlockFlags::PULL_NO_BLOCK
        );
    }

    #[test]
    fn rejects_unknown_token() {
        assert!(string_to_block_flags("bogus").is_err());
        assert!(string_to_block_flags("block_no_input,bogus").is_err());
    }

    #[test]
    fn rejects_pull_poke_token() {
        // PULL_POKE is a call-site flag, not a configurable block flag.
        assert!(string_to_block_flags("pull_poke").is_err());
    }
}
