//! Best-effort natural-language recognition for chat ingestion (spec.md
//! §4.3, §4.7.4). Output is always a canonical `DW …` string so callers can
//! feed it straight back through [`crate::parse`] — auto-detect never
//! returns a [`dw_schemas::ParsedCommand`] directly.

/// Recognizes a handful of common phrasings and rewrites them to the
/// canonical `DW <VERB> …` surface. Returns `None` when nothing matches;
/// callers (chat tick, poll tick) fall back to reporting the raw text as
/// unparseable.
pub fn try_auto_detect(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.to_ascii_uppercase().starts_with("DW ") {
        return Some(trimmed.to_string());
    }

    let tokens: Vec<&str> = trimmed.split_whitespace().collect();
    let lower: Vec<String> = tokens.iter().map(|t| t.to_ascii_lowercase()).collect();

    if let Some(payout) = detect_payout(&tokens, &lower) {
        return Some(payout);
    }
    if let Some(chain_verb) = detect_chain_verb(&tokens, &lower) {
        return Some(chain_verb);
    }
    if lower.first().map(String::as_str) == Some("balance")
        || (lower.len() >= 2 && lower[0] == "my" && lower[1] == "balance")
    {
        return Some("DW BALANCE".to_string());
    }
    if lower.first().map(String::as_str) == Some("price") {
        return match tokens.get(1) {
            Some(pair) => Some(format!("DW PRICE {pair}")),
            None => Some("DW PRICE".to_string()),
        };
    }
    if lower.first().map(String::as_str) == Some("status") {
        return Some("DW STATUS".to_string());
    }
    if lower.first().map(String::as_str) == Some("setup") {
        return Some("DW SETUP".to_string());
    }
    if lower.first().map(String::as_str) == Some("rebalance") {
        return Some("DW REBALANCE".to_string());
    }

    None
}

/// "send <amount> <asset> to <addr>" → `DW PAYOUT <amount> <asset> TO <addr>`.
fn detect_payout(tokens: &[&str], lower: &[String]) -> Option<String> {
    if lower.first().map(String::as_str) != Some("send") {
        return None;
    }
    let amount = tokens.get(1)?;
    let asset = tokens.get(2)?;
    let to_idx = lower.iter().position(|t| t == "to")?;
    let dest = tokens.get(to_idx + 1)?;
    Some(format!(
        "DW PAYOUT {amount} {} TO {dest}",
        asset.to_ascii_uppercase()
    ))
}

/// "<chain> balance" / "<chain> price" → `DW <CHAIN>_BALANCE` / `_PRICE`.
fn detect_chain_verb(tokens: &[&str], lower: &[String]) -> Option<String> {
    if tokens.len() < 2 {
        return None;
    }
    let chain = tokens[0];
    if !chain.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    match lower[1].as_str() {
        "balance" => Some(format!("DW {}_BALANCE", chain.to_ascii_uppercase())),
        "price" => Some(format!("DW {}_PRICE", chain.to_ascii_uppercase())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    #[test]
    fn send_phrase_matches_canonical_payout() {
        let detected = try_auto_detect("send 10 USDC to 0xabc").unwrap();
        assert_eq!(
            parse(&detected).unwrap(),
            parse("DW PAYOUT 10 USDC TO 0xabc").unwrap()
        );
    }

    #[test]
    fn chain_balance_phrase_detected() {
        assert_eq!(
            try_auto_detect("eth balance").as_deref(),
            Some("DW ETH_BALANCE")
        );
    }

    #[test]
    fn already_canonical_passes_through() {
        assert_eq!(
            try_auto_detect("DW STATUS").as_deref(),
            Some("DW STATUS")
        );
    }

    #[test]
    fn unrecognized_phrase_returns_none() {
        assert_eq!(try_auto_detect("what is the weather"), None);
    }
}
