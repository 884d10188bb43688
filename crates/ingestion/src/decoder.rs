use chrono::{TimeZone, Utc};
use solswap_core_types::SwapEvent;
use solswap_rpc::TransactionMeta;
use std::collections::BTreeMap;

use crate::registry::{resolve_symbol, DexProgram};

/// Why a transaction did not yield a swap. Rejections are silent at the event
/// level; the poller logs them with this reason for observability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeReject {
    TransactionFailed,
    TooFewTokenBalances,
    TooFewBalanceChanges,
    /// Zero or more than one mint with a negative delta.
    NoInputLeg,
    /// Zero or more than one mint with a positive delta.
    NoOutputLeg,
    ZeroAmount,
    /// Both legs resolve to the same symbol (wrapped conversions).
    SameToken,
}

impl DecodeReject {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TransactionFailed => "transaction_failed",
            Self::TooFewTokenBalances => "too_few_token_balances",
            Self::TooFewBalanceChanges => "too_few_balance_changes",
            Self::NoInputLeg => "no_input_leg",
            Self::NoOutputLeg => "no_output_leg",
            Self::ZeroAmount => "zero_amount",
            Self::SameToken => "same_token",
        }
    }
}

const DELTA_EPS: f64 = 1e-12;

/// Reconstructs a swap from pre/post SPL token-balance diffs. Pure and total:
/// every input either produces a valid event or a classified rejection.
///
/// Guarantees on success: `amount_in > 0`, `amount_out > 0`,
/// `token_in != token_out`, `price == amount_out / amount_in`.
pub fn decode_swap(
    signature: &str,
    block_time: Option<i64>,
    meta: &TransactionMeta,
    program: &DexProgram,
) -> Result<SwapEvent, DecodeReject> {
    if meta.err.is_some() {
        return Err(DecodeReject::TransactionFailed);
    }
    if meta.pre_token_balances.len() < 2 || meta.post_token_balances.len() < 2 {
        return Err(DecodeReject::TooFewTokenBalances);
    }

    // Net UI-amount delta per mint across all token accounts.
    let mut deltas: BTreeMap<&str, f64> = BTreeMap::new();
    for balance in &meta.pre_token_balances {
        if let Some(amount) = balance.ui_token_amount.ui() {
            *deltas.entry(balance.mint.as_str()).or_default() -= amount;
        }
    }
    for balance in &meta.post_token_balances {
        if let Some(amount) = balance.ui_token_amount.ui() {
            *deltas.entry(balance.mint.as_str()).or_default() += amount;
        }
    }

    let changes: Vec<(&str, f64)> = deltas
        .into_iter()
        .filter(|(_, delta)| delta.abs() > DELTA_EPS)
        .collect();
    if changes.len() < 2 {
        return Err(DecodeReject::TooFewBalanceChanges);
    }

    let mut inputs = changes.iter().filter(|(_, delta)| *delta < 0.0);
    let (mint_in, delta_in) = *inputs.next().ok_or(DecodeReject::NoInputLeg)?;
    if inputs.next().is_some() {
        return Err(DecodeReject::NoInputLeg);
    }

    let mut outputs = changes.iter().filter(|(_, delta)| *delta > 0.0);
    let (mint_out, delta_out) = *outputs.next().ok_or(DecodeReject::NoOutputLeg)?;
    if outputs.next().is_some() {
        return Err(DecodeReject::NoOutputLeg);
    }

    let amount_in = -delta_in;
    let amount_out = delta_out;
    if !(amount_in > 0.0) || !(amount_out > 0.0) {
        return Err(DecodeReject::ZeroAmount);
    }

    let token_in = resolve_symbol(mint_in);
    let token_out = resolve_symbol(mint_out);
    if token_in == token_out {
        return Err(DecodeReject::SameToken);
    }

    let timestamp = block_time
        .and_then(|seconds| Utc.timestamp_opt(seconds, 0).single())
        .unwrap_or_else(Utc::now);

    Ok(SwapEvent {
        signature: signature.to_string(),
        timestamp,
        pair: SwapEvent::derive_pair(&token_in, &token_out),
        token_in,
        token_out,
        amount_in,
        amount_out,
        price: amount_out / amount_in,
        fee: program.fee,
        pool: program.pool.to_string(),
        dex: program.dex.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::WATCHED_PROGRAMS;
    use solswap_rpc::{TokenAmount, TokenBalance};

    const SOL_MINT: &str = "So11111111111111111111111111111111111111112";
    const USDC_MINT: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";
    const USDT_MINT: &str = "Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB";

    fn balance(account_index: u32, mint: &str, ui: f64) -> TokenBalance {
        TokenBalance {
            account_index,
            mint: mint.to_string(),
            owner: None,
            ui_token_amount: TokenAmount {
                amount: String::new(),
                decimals: 9,
                ui_amount: Some(ui),
                ui_amount_string: String::new(),
            },
        }
    }

    fn meta(pre: Vec<TokenBalance>, post: Vec<TokenBalance>) -> TransactionMeta {
        TransactionMeta {
            err: None,
            pre_balances: vec![],
            post_balances: vec![],
            pre_token_balances: pre,
            post_token_balances: post,
        }
    }

    fn jupiter() -> &'static DexProgram {
        &WATCHED_PROGRAMS[0]
    }

    #[test]
    fn decodes_a_simple_two_leg_swap() {
        let meta = meta(
            vec![balance(1, SOL_MINT, 5.0), balance(2, USDC_MINT, 10.0)],
            vec![balance(1, SOL_MINT, 3.0), balance(2, USDC_MINT, 407.0)],
        );

        let swap = decode_swap("sig1", Some(1_700_000_000), &meta, jupiter()).unwrap();
        assert_eq!(swap.token_in, "SOL");
        assert_eq!(swap.token_out, "USDC");
        assert!((swap.amount_in - 2.0).abs() < 1e-9);
        assert!((swap.amount_out - 397.0).abs() < 1e-9);
        assert!((swap.price - 198.5).abs() < 1e-9);
        assert_eq!(swap.pair, "SOL/USDC");
        assert_eq!(swap.dex, "Jupiter");
        assert_eq!(swap.pool, "JupiterAggregator");
        assert!((swap.fee - 0.0025).abs() < f64::EPSILON);
        assert_eq!(swap.timestamp.timestamp(), 1_700_000_000);

        // decoder invariants
        assert!(swap.amount_in > 0.0);
        assert!(swap.amount_out > 0.0);
        assert_ne!(swap.token_in, swap.token_out);
        assert!((swap.price - swap.amount_out / swap.amount_in).abs() < f64::EPSILON);
    }

    #[test]
    fn aggregates_deltas_across_multiple_accounts_per_mint() {
        // Two token accounts holding the same mint; net delta decides the leg.
        let meta = meta(
            vec![
                balance(1, SOL_MINT, 4.0),
                balance(2, SOL_MINT, 3.0),
                balance(3, USDC_MINT, 0.0),
            ],
            vec![
                balance(1, SOL_MINT, 1.0),
                balance(2, SOL_MINT, 3.5),
                balance(3, USDC_MINT, 500.0),
            ],
        );

        let swap = decode_swap("sig2", None, &meta, jupiter()).unwrap();
        assert!((swap.amount_in - 2.5).abs() < 1e-9);
        assert!((swap.amount_out - 500.0).abs() < 1e-9);
    }

    #[test]
    fn rejects_failed_transaction() {
        let mut failed = meta(
            vec![balance(1, SOL_MINT, 5.0), balance(2, USDC_MINT, 0.0)],
            vec![balance(1, SOL_MINT, 3.0), balance(2, USDC_MINT, 397.0)],
        );
        failed.err = Some(serde_json::json!({"InstructionError": [0, "Custom"]}));
        assert_eq!(
            decode_swap("sig", None, &failed, jupiter()),
            Err(DecodeReject::TransactionFailed)
        );
    }

    #[test]
    fn rejects_when_fewer_than_two_balance_entries() {
        let meta = meta(
            vec![balance(1, SOL_MINT, 5.0)],
            vec![balance(1, SOL_MINT, 3.0), balance(2, USDC_MINT, 397.0)],
        );
        assert_eq!(
            decode_swap("sig", None, &meta, jupiter()),
            Err(DecodeReject::TooFewTokenBalances)
        );
    }

    #[test]
    fn rejects_when_nothing_changed() {
        let meta = meta(
            vec![balance(1, SOL_MINT, 5.0), balance(2, USDC_MINT, 100.0)],
            vec![balance(1, SOL_MINT, 5.0), balance(2, USDC_MINT, 100.0)],
        );
        assert_eq!(
            decode_swap("sig", None, &meta, jupiter()),
            Err(DecodeReject::TooFewBalanceChanges)
        );
    }

    #[test]
    fn rejects_ambiguous_input_legs() {
        let meta = meta(
            vec![
                balance(1, SOL_MINT, 5.0),
                balance(2, USDT_MINT, 50.0),
                balance(3, USDC_MINT, 0.0),
            ],
            vec![
                balance(1, SOL_MINT, 4.0),
                balance(2, USDT_MINT, 40.0),
                balance(3, USDC_MINT, 200.0),
            ],
        );
        assert_eq!(
            decode_swap("sig", None, &meta, jupiter()),
            Err(DecodeReject::NoInputLeg)
        );
    }

    #[test]
    fn rejects_ambiguous_output_legs() {
        let meta = meta(
            vec![
                balance(1, SOL_MINT, 5.0),
                balance(2, USDT_MINT, 0.0),
                balance(3, USDC_MINT, 0.0),
            ],
            vec![
                balance(1, SOL_MINT, 4.0),
                balance(2, USDT_MINT, 40.0),
                balance(3, USDC_MINT, 200.0),
            ],
        );
        assert_eq!(
            decode_swap("sig", None, &meta, jupiter()),
            Err(DecodeReject::NoOutputLeg)
        );
    }

    #[test]
    fn rejects_wrapped_conversion_between_same_symbol() {
        // Different mints that truncate to the same fallback symbol.
        let mint_a = "AbcdE11111111111111111111111111111111wxyz";
        let mint_b = "AbcdF22222222222222222222222222222222wxyz";
        let meta = meta(
            vec![balance(1, mint_a, 10.0), balance(2, mint_b, 0.0)],
            vec![balance(1, mint_a, 0.0), balance(2, mint_b, 10.0)],
        );
        assert_eq!(
            decode_swap("sig", None, &meta, jupiter()),
            Err(DecodeReject::SameToken)
        );
    }

    #[test]
    fn unknown_mint_gets_truncated_symbol() {
        let unknown = "Fm9rHUTF5v3hwMLbStjZXqNBBoZyGriQaFM6sTFz3K8A";
        let meta = meta(
            vec![balance(1, SOL_MINT, 2.0), balance(2, unknown, 0.0)],
            vec![balance(1, SOL_MINT, 0.0), balance(2, unknown, 1000.0)],
        );
        let swap = decode_swap("sig", None, &meta, jupiter()).unwrap();
        assert_eq!(swap.token_out, "Fm9r…3K8A");
        assert_eq!(swap.pair, "SOL/Fm9r…3K8A");
    }

    #[test]
    fn missing_block_time_falls_back_to_now() {
        let meta = meta(
            vec![balance(1, SOL_MINT, 5.0), balance(2, USDC_MINT, 0.0)],
            vec![balance(1, SOL_MINT, 3.0), balance(2, USDC_MINT, 397.0)],
        );
        let before = Utc::now();
        let swap = decode_swap("sig", None, &meta, jupiter()).unwrap();
        assert!(swap.timestamp >= before);
    }
}
