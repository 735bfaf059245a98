//! Burn ledger normalization.
//!
//! Token lists arrive as `"<amount>@<SYMBOL>"` strings. A malformed entry is
//! dropped from its list with a warning; it never poisons the rest.

use super::records::{BurnRecord, Domain, TokenAmountRecord};
use super::WarningLog;
use crate::fixed_point::{Decimal, DEFAULT_DECIMALS};
use crate::ocean::models::BurnData;

/// Parse one compact token amount entry.
pub fn parse_token_amount(entry: &str) -> Result<(Decimal, String), String> {
    let (amount, symbol) = entry
        .trim()
        .split_once('@')
        .ok_or_else(|| "missing '@' separator".to_string())?;
    let symbol = symbol.trim();
    if symbol.is_empty() {
        return Err("empty token symbol".to_string());
    }
    let amount =
        Decimal::parse(amount).map_err(|reason| format!("amount is {}", reason))?;
    Ok((amount, symbol.to_string()))
}

fn token_list(list: &str, entries: &[String], log: &mut WarningLog) -> Vec<TokenAmountRecord> {
    entries
        .iter()
        .filter_map(|entry| match parse_token_amount(entry) {
            Ok((amount, token)) => {
                let amount = log.scale(Domain::Burn, Some(list), &token, amount, DEFAULT_DECIMALS);
                Some(TokenAmountRecord { amount, token })
            }
            Err(problem) => {
                log.malformed(Domain::Burn, list, entry, problem);
                None
            }
        })
        .collect()
}

pub fn normalize_burn(burn: &BurnData, log: &mut WarningLog) -> BurnRecord {
    let mut amount = |field: &str, value: Option<f64>| {
        log.scale(Domain::Burn, None, field, value, DEFAULT_DECIMALS)
    };

    let feeburn = amount("feeburn", burn.feeburn);
    let emissionburn = amount("emissionburn", burn.emissionburn);
    let auctionburn = amount("auctionburn", burn.auctionburn);
    let paybackburn = amount("paybackburn", burn.paybackburn);
    let dfipaybackfee = amount("dfipaybackfee", burn.dfipaybackfee);

    BurnRecord {
        address: burn.address.clone(),
        amount: log.scale(Domain::Burn, None, "amount", &burn.amount, DEFAULT_DECIMALS),
        tokens: token_list("tokens", &burn.tokens, log),
        feeburn,
        emissionburn,
        auctionburn,
        paybackburn,
        paybackburntokens: token_list("paybackburntokens", &burn.paybackburntokens, log),
        dexfeetokens: token_list("dexfeetokens", &burn.dexfeetokens, log),
        dfipaybackfee,
        dfipaybacktokens: token_list("dfipaybacktokens", &burn.dfipaybacktokens, log),
        paybackfees: token_list("paybackfees", &burn.paybackfees, log),
        paybacktokens: token_list("paybacktokens", &burn.paybacktokens, log),
        dfip2203: token_list("dfip2203", &burn.dfip2203, log),
        dfip2206f: token_list("dfip2206f", &burn.dfip2206f, log),
        decimals: DEFAULT_DECIMALS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::WarningKind;
    use alloy::primitives::U256;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_compact_entries() {
        let (amount, token) = parse_token_amount("155.12345678@DFI").unwrap();
        assert_eq!(amount, Decimal::parse("155.12345678").unwrap());
        assert_eq!(token, "DFI");

        assert!(parse_token_amount("155.1").is_err());
        assert!(parse_token_amount("abc@DFI").is_err());
        assert!(parse_token_amount("1@").is_err());
    }

    #[test]
    fn malformed_entry_is_dropped_not_fatal() {
        let burn = BurnData {
            address: "8defichainBurnAddressXXXXXXXzcNHEm".to_string(),
            amount: Some("0.5".to_string()),
            tokens: strings(&["1.5@DFI", "garbage", "2@dBTC"]),
            feeburn: Some(10.0),
            emissionburn: Some(20.0),
            auctionburn: Some(0.0),
            paybackburn: Some(1.25),
            dfipaybackfee: Some(0.0),
            dexfeetokens: strings(&["0.1@DUSD"]),
            ..Default::default()
        };
        let mut log = WarningLog::new();
        let rec = normalize_burn(&burn, &mut log);

        assert_eq!(rec.tokens.len(), 2);
        assert_eq!(rec.tokens[0].token, "DFI");
        assert_eq!(
            rec.tokens[0].amount,
            U256::from(1_500_000_000_000_000_000u128)
        );
        assert_eq!(rec.tokens[1].token, "dBTC");
        assert_eq!(rec.dexfeetokens[0].amount, U256::from(100_000_000_000_000_000u128));
        assert_eq!(rec.amount, U256::from(500_000_000_000_000_000u128));
        assert_eq!(rec.paybackburn, U256::from(1_250_000_000_000_000_000u128));

        let warnings = log.into_inner();
        assert_eq!(warnings.len(), 1);
        assert!(matches!(
            &warnings[0].kind,
            WarningKind::MalformedEntry { entry, .. } if entry == "garbage"
        ));
        assert_eq!(warnings[0].subject.as_deref(), Some("tokens"));
    }
}
