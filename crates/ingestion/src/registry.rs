use once_cell::sync::Lazy;
use std::collections::HashMap;

/// One watched DEX program: identity plus the nominal attributes stamped onto
/// every swap decoded for it. `fee` is the program's published rate, not a
/// realised per-transaction fee.
#[derive(Debug, Clone, PartialEq)]
pub struct DexProgram {
    pub address: &'static str,
    pub dex: &'static str,
    pub pool: &'static str,
    pub fee: f64,
}

/// The indexed program set. Extending coverage is a matter of adding entries
/// here; nothing else hardcodes addresses.
pub static WATCHED_PROGRAMS: &[DexProgram] = &[
    DexProgram {
        address: "JUP6LkbZbjS1jKKwapdHNy74zcZ3tLUZoi5QNyVTaV4",
        dex: "Jupiter",
        pool: "JupiterAggregator",
        fee: 0.0025,
    },
    DexProgram {
        address: "9W959DqEETiGZocYWCQPaJ6sBmUzgfxXfqGeTEdp3aQP",
        dex: "Orca",
        pool: "OrcaLegacy",
        fee: 0.003,
    },
    // Whirlpool fees vary by pool; nominal value for indexing and display.
    DexProgram {
        address: "whirLbMiicVdio4qvUfM5KAg6Ct8VwpYzGff3uctyCc",
        dex: "OrcaWhirlpool",
        pool: "OrcaWhirlpool",
        fee: 0.002,
    },
];

static TOKEN_SYMBOLS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("So11111111111111111111111111111111111111112", "SOL"),
        ("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v", "USDC"),
        ("Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB", "USDT"),
        ("mSoLzYCxHdYgdzU16g5QSh3i5K3z3KZK7ytfqcJm7So", "mSOL"),
        ("7vfCXTUXx5WJV5JADk17DUJ4ksgau7utNKj4b963voxs", "ETH"),
        ("3NZ9JMVBmGAqocybic2c7LQCJScmgsAZ6vQqTDzcqmJh", "BTC"),
        ("DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263", "BONK"),
        ("7GCihgDB8fe6KNjn2MYtkzZcRjQy3t9GHdC8uHYmW2hr", "POPCAT"),
        ("JUPyiwrYJFskUPiHa7hkeR8VUtAeFoSYbKedZNsDvCN", "JUP"),
        ("4k3Dyjzvzp8eMZWUXbBCjEvwSkkk59S5iCNLY3QrkX6R", "RAY"),
        ("9n4nbM75f5Ui33ZbPYXn59EwSgE8CGsHtAeTH5YFeJ9E", "BTC-w"),
    ])
});

/// Known mint → symbol, otherwise a truncated mint so unknown tokens stay
/// distinguishable without a metadata lookup.
pub fn resolve_symbol(mint: &str) -> String {
    if let Some(symbol) = TOKEN_SYMBOLS.get(mint) {
        return (*symbol).to_string();
    }
    truncate_mint(mint)
}

fn truncate_mint(mint: &str) -> String {
    if mint.len() <= 8 {
        return mint.to_string();
    }
    // Base58 is pure ASCII, byte slicing is safe.
    format!("{}…{}", &mint[..4], &mint[mint.len() - 4..])
}

pub fn program_by_address(address: &str) -> Option<&'static DexProgram> {
    WATCHED_PROGRAMS
        .iter()
        .find(|program| program.address == address)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_mints_resolve_to_symbols() {
        assert_eq!(
            resolve_symbol("So11111111111111111111111111111111111111112"),
            "SOL"
        );
        assert_eq!(
            resolve_symbol("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v"),
            "USDC"
        );
    }

    #[test]
    fn unknown_mints_truncate_to_first4_last4() {
        assert_eq!(
            resolve_symbol("Fm9rHUTF5v3hwMLbStjZXqNBBoZyGriQaFM6sTFz3K8A"),
            "Fm9r…3K8A"
        );
        assert_eq!(resolve_symbol("short"), "short");
    }

    #[test]
    fn watched_programs_are_unique_by_address() {
        for (i, a) in WATCHED_PROGRAMS.iter().enumerate() {
            for b in &WATCHED_PROGRAMS[i + 1..] {
                assert_ne!(a.address, b.address);
            }
        }
        assert!(program_by_address("JUP6LkbZbjS1jKKwapdHNy74zcZ3tLUZoi5QNyVTaV4").is_some());
        assert!(program_by_address("unknown").is_none());
    }
}
