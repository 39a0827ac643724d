//! Tokenizer and grammar for the `DW <VERB> <args…>` command surface
//! (spec.md §6). `parse` and `format` are pure and total: `format` never
//! fails, and `parse` fails only with a [`ParseError`] naming the bad token.

use dw_schemas::ParsedCommand;

use crate::error::ParseError;

const PREFIX: &str = "DW";

/// Parses a raw command string into a tagged [`ParsedCommand`].
///
/// Verbs are matched case-insensitively; everything else (addresses,
/// amounts, ids) is preserved verbatim so round-tripping through `format`
/// reproduces the user's original casing on arguments.
pub fn parse(raw: &str) -> Result<ParsedCommand, ParseError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ParseError::new("", "empty command"));
    }

    let tokens: Vec<&str> = trimmed.split_whitespace().collect();
    if tokens.is_empty() {
        return Err(ParseError::new("", "empty command"));
    }

    if !tokens[0].eq_ignore_ascii_case(PREFIX) {
        return Err(ParseError::new(
            tokens[0],
            "command must start with DW",
        ));
    }

    let verb_token = tokens
        .get(1)
        .ok_or_else(|| ParseError::new("", "missing verb after DW"))?;
    let verb = verb_token.to_ascii_uppercase();
    let args = &tokens[2..];

    parse_verb(&verb, verb_token, args, trimmed)
}

fn parse_verb(
    verb: &str,
    verb_token: &str,
    args: &[&str],
    full_raw: &str,
) -> Result<ParsedCommand, ParseError> {
    match verb {
        "SETUP" => Ok(ParsedCommand::Setup),
        "STATUS" => Ok(ParsedCommand::Status),
        "TREASURY" => Ok(ParsedCommand::Treasury),
        "PRICE" => Ok(ParsedCommand::Price {
            pair: args.first().map(|s| s.to_string()),
        }),
        "BALANCE" => Ok(ParsedCommand::Balance),
        "REBALANCE" => Ok(ParsedCommand::Rebalance),
        "AUTO_REBALANCE" => {
            let flag = args
                .first()
                .ok_or_else(|| ParseError::new(verb_token, "AUTO_REBALANCE requires ON|OFF"))?;
            match flag.to_ascii_uppercase().as_str() {
                "ON" => Ok(ParsedCommand::AutoRebalance { on: true }),
                "OFF" => Ok(ParsedCommand::AutoRebalance { on: false }),
                _ => Err(ParseError::new(*flag, "expected ON or OFF")),
            }
        }
        "CANCEL_ORDER" => {
            let order_id = require_arg(args, 0, verb_token, "CANCEL_ORDER requires an order id")?;
            Ok(ParsedCommand::CancelOrder {
                order_id: order_id.to_string(),
            })
        }
        "CANCEL_SCHEDULE" => {
            let schedule_id =
                require_arg(args, 0, verb_token, "CANCEL_SCHEDULE requires a schedule id")?;
            Ok(ParsedCommand::CancelSchedule {
                schedule_id: schedule_id.to_string(),
            })
        }
        "ALERT_THRESHOLD" => {
            let coin = require_arg(args, 0, verb_token, "ALERT_THRESHOLD requires a coin")?;
            let amount = require_arg(args, 1, verb_token, "ALERT_THRESHOLD requires an amount")?;
            Ok(ParsedCommand::AlertThreshold {
                coin: coin.to_string(),
                amount: amount.to_string(),
            })
        }
        "SCHEDULE" => parse_schedule(verb_token, args, full_raw),
        "PAYOUT" => parse_payout(verb_token, args),
        "BRIDGE" => parse_bridge(verb_token, args),
        "STOP_LOSS" => parse_conditional_order(verb_token, args, true),
        "TAKE_PROFIT" => parse_conditional_order(verb_token, args, false),
        "CONTRACT_CALL" => parse_contract(verb_token, args, true),
        "CONTRACT_READ" => parse_contract(verb_token, args, false),
        _ => parse_chain_suffixed(verb, verb_token, args),
    }
}

fn require_arg<'a>(
    args: &'a [&'a str],
    index: usize,
    verb_token: &str,
    message: &str,
) -> Result<&'a str, ParseError> {
    args.get(index)
        .copied()
        .ok_or_else(|| ParseError::new(verb_token, message))
}

/// `DW SCHEDULE EVERY <N>h: <inner…>`. The inner command text is the
/// remainder of `full_raw` after the `<N>h:` token, preserving its
/// original spacing rather than re-joining the split tokens.
fn parse_schedule(
    verb_token: &str,
    args: &[&str],
    full_raw: &str,
) -> Result<ParsedCommand, ParseError> {
    let every = args
        .first()
        .ok_or_else(|| ParseError::new(verb_token, "SCHEDULE requires EVERY <N>h: <inner>"))?;
    if !every.eq_ignore_ascii_case("EVERY") {
        return Err(ParseError::new(*every, "expected EVERY"));
    }
    let interval_token = args
        .get(1)
        .ok_or_else(|| ParseError::new(verb_token, "SCHEDULE requires an interval"))?;
    let digits = interval_token
        .strip_suffix("h:")
        .or_else(|| interval_token.strip_suffix('h'))
        .ok_or_else(|| ParseError::new(*interval_token, "expected an interval like 1h:"))?;
    let interval_hours: u32 = digits
        .parse()
        .map_err(|_| ParseError::new(*interval_token, "interval must be an integer hour count"))?;

    let marker = format!("{interval_token} ");
    let inner_command_text = full_raw
        .find(interval_token)
        .map(|idx| full_raw[idx + marker.len() - 1..].trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ParseError::new(verb_token, "SCHEDULE requires an inner command"))?;

    Ok(ParsedCommand::Schedule {
        interval_hours,
        inner_command_text,
    })
}

/// `DW PAYOUT <amount> <asset> TO <to>`.
fn parse_payout(verb_token: &str, args: &[&str]) -> Result<ParsedCommand, ParseError> {
    let amount = require_arg(args, 0, verb_token, "PAYOUT requires an amount")?;
    let asset = require_arg(args, 1, verb_token, "PAYOUT requires an asset")?;
    let to_kw = require_arg(args, 2, verb_token, "PAYOUT requires TO <recipient>")?;
    if !to_kw.eq_ignore_ascii_case("TO") {
        return Err(ParseError::new(to_kw, "expected TO"));
    }
    let to = require_arg(args, 3, verb_token, "PAYOUT requires a recipient")?;
    Ok(ParsedCommand::Payout {
        asset: asset.to_string(),
        amount: amount.to_string(),
        to: to.to_string(),
    })
}

/// `DW BRIDGE <fromChain> <toChain> <amount> <destAddr>`.
fn parse_bridge(verb_token: &str, args: &[&str]) -> Result<ParsedCommand, ParseError> {
    let from_chain = require_arg(args, 0, verb_token, "BRIDGE requires a source chain")?;
    let to_chain = require_arg(args, 1, verb_token, "BRIDGE requires a destination chain")?;
    let amount = require_arg(args, 2, verb_token, "BRIDGE requires an amount")?;
    let dest_addr = require_arg(args, 3, verb_token, "BRIDGE requires a destination address")?;
    Ok(ParsedCommand::Bridge {
        from_chain: from_chain.to_ascii_uppercase(),
        to_chain: to_chain.to_ascii_uppercase(),
        amount: amount.to_string(),
        dest_addr: dest_addr.to_string(),
    })
}

/// `DW STOP_LOSS <base> <quote> <triggerPrice> <qty>` (and `TAKE_PROFIT`).
fn parse_conditional_order(
    verb_token: &str,
    args: &[&str],
    is_stop_loss: bool,
) -> Result<ParsedCommand, ParseError> {
    let base = require_arg(args, 0, verb_token, "requires a base asset")?;
    let quote = require_arg(args, 1, verb_token, "requires a quote asset")?;
    let trigger_price = require_arg(args, 2, verb_token, "requires a trigger price")?;
    let qty = require_arg(args, 3, verb_token, "requires a quantity")?;
    let (base, quote, trigger_price, qty) = (
        base.to_string(),
        quote.to_string(),
        trigger_price.to_string(),
        qty.to_string(),
    );
    Ok(if is_stop_loss {
        ParsedCommand::StopLoss {
            base,
            quote,
            trigger_price,
            qty,
        }
    } else {
        ParsedCommand::TakeProfit {
            base,
            quote,
            trigger_price,
            qty,
        }
    })
}

/// `DW CONTRACT_CALL|CONTRACT_READ <chain> <contract> <method> [args…]`.
fn parse_contract(
    verb_token: &str,
    args: &[&str],
    is_call: bool,
) -> Result<ParsedCommand, ParseError> {
    let chain = require_arg(args, 0, verb_token, "requires a chain")?;
    let contract = require_arg(args, 1, verb_token, "requires a contract")?;
    let method = require_arg(args, 2, verb_token, "requires a method")?;
    let extra = args.get(3..).unwrap_or(&[]);
    let (chain, contract, method) = (
        chain.to_ascii_uppercase(),
        contract.to_string(),
        method.to_string(),
    );
    let call_args: Vec<String> = extra.iter().map(|s| s.to_string()).collect();
    Ok(if is_call {
        ParsedCommand::ContractCall {
            chain,
            contract,
            method,
            args: call_args,
        }
    } else {
        ParsedCommand::ContractRead {
            chain,
            contract,
            method,
            args: call_args,
        }
    })
}

/// The long tail of per-chain verbs: `<CHAIN>_SEND`, `<CHAIN>_BALANCE`,
/// `<CHAIN>_PRICE` (spec.md §6). Any uppercase-alnum prefix is accepted as
/// a chain code; the dispatcher is responsible for rejecting unknown chains.
fn parse_chain_suffixed(
    verb: &str,
    verb_token: &str,
    args: &[&str],
) -> Result<ParsedCommand, ParseError> {
    for (suffix, build) in [
        ("_SEND", ChainVerb::Send),
        ("_BALANCE", ChainVerb::Balance),
        ("_PRICE", ChainVerb::Price),
    ] {
        if let Some(chain) = verb.strip_suffix(suffix) {
            if chain.is_empty() || !chain.chars().all(|c| c.is_ascii_alphanumeric()) {
                break;
            }
            return build.parse(chain, verb_token, args);
        }
    }
    Err(ParseError::new(verb_token, "unrecognized verb"))
}

enum ChainVerb {
    Send,
    Balance,
    Price,
}

impl ChainVerb {
    fn parse(
        &self,
        chain: &str,
        verb_token: &str,
        args: &[&str],
    ) -> Result<ParsedCommand, ParseError> {
        let chain = chain.to_ascii_uppercase();
        match self {
            ChainVerb::Send => {
                let to = require_arg(args, 0, verb_token, "requires a recipient")?;
                let amount = require_arg(args, 1, verb_token, "requires an amount")?;
                Ok(ParsedCommand::ChainSend {
                    chain,
                    to: to.to_string(),
                    amount: amount.to_string(),
                })
            }
            ChainVerb::Balance => Ok(ParsedCommand::ChainBalance { chain }),
            ChainVerb::Price => Ok(ParsedCommand::ChainPrice { chain }),
        }
    }
}

/// Renders a [`ParsedCommand`] back to its canonical `DW <VERB> …` form.
/// `format(parse(s)) == s` for any `s` already in canonical form
/// (spec.md §8 round-trip law).
pub fn format(cmd: &ParsedCommand) -> String {
    match cmd {
        ParsedCommand::Setup => "DW SETUP".to_string(),
        ParsedCommand::Status => "DW STATUS".to_string(),
        ParsedCommand::Treasury => "DW TREASURY".to_string(),
        ParsedCommand::Balance => "DW BALANCE".to_string(),
        ParsedCommand::Rebalance => "DW REBALANCE".to_string(),
        ParsedCommand::Price { pair } => match pair {
            Some(p) => format!("DW PRICE {p}"),
            None => "DW PRICE".to_string(),
        },
        ParsedCommand::AutoRebalance { on } => {
            format!("DW AUTO_REBALANCE {}", if *on { "ON" } else { "OFF" })
        }
        ParsedCommand::CancelOrder { order_id } => format!("DW CANCEL_ORDER {order_id}"),
        ParsedCommand::CancelSchedule { schedule_id } => {
            format!("DW CANCEL_SCHEDULE {schedule_id}")
        }
        ParsedCommand::AlertThreshold { coin, amount } => {
            format!("DW ALERT_THRESHOLD {coin} {amount}")
        }
        ParsedCommand::Schedule {
            interval_hours,
            inner_command_text,
        } => format!("DW SCHEDULE EVERY {interval_hours}h: {inner_command_text}"),
        ParsedCommand::Payout { asset, amount, to } => {
            format!("DW PAYOUT {amount} {asset} TO {to}")
        }
        ParsedCommand::Bridge {
            from_chain,
            to_chain,
            amount,
            dest_addr,
        } => format!("DW BRIDGE {from_chain} {to_chain} {amount} {dest_addr}"),
        ParsedCommand::StopLoss {
            base,
            quote,
            trigger_price,
            qty,
        } => format!("DW STOP_LOSS {base} {quote} {trigger_price} {qty}"),
        ParsedCommand::TakeProfit {
            base,
            quote,
            trigger_price,
            qty,
        } => format!("DW TAKE_PROFIT {base} {quote} {trigger_price} {qty}"),
        ParsedCommand::ContractCall {
            chain,
            contract,
            method,
            args,
        } => format_contract("CONTRACT_CALL", chain, contract, method, args),
        ParsedCommand::ContractRead {
            chain,
            contract,
            method,
            args,
        } => format_contract("CONTRACT_READ", chain, contract, method, args),
        ParsedCommand::ChainSend { chain, to, amount } => {
            format!("DW {chain}_SEND {to} {amount}")
        }
        ParsedCommand::ChainBalance { chain } => format!("DW {chain}_BALANCE"),
        ParsedCommand::ChainPrice { chain } => format!("DW {chain}_PRICE"),
    }
}

fn format_contract(verb: &str, chain: &str, contract: &str, method: &str, args: &[String]) -> String {
    let mut out = format!("DW {verb} {chain} {contract} {method}");
    for a in args {
        out.push(' ');
        out.push_str(a);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_chain_send() {
        let raw = "DW STX_SEND <addr> 1000000";
        let parsed = parse(raw).unwrap();
        assert_eq!(format(&parsed), raw);
    }

    #[test]
    fn round_trips_setup_and_status() {
        for raw in ["DW SETUP", "DW STATUS", "DW TREASURY", "DW REBALANCE"] {
            assert_eq!(format(&parse(raw).unwrap()), raw);
        }
    }

    #[test]
    fn schedule_preserves_inner_command_text() {
        let raw = "DW SCHEDULE EVERY 1h: STATUS";
        let parsed = parse(raw).unwrap();
        assert_eq!(
            parsed,
            ParsedCommand::Schedule {
                interval_hours: 1,
                inner_command_text: "STATUS".to_string(),
            }
        );
        assert_eq!(format(&parsed), raw);
    }

    #[test]
    fn schedule_preserves_nested_dw_command() {
        let raw = "DW SCHEDULE EVERY 24h: DW ETH_BALANCE";
        let parsed = parse(raw).unwrap();
        assert_eq!(
            parsed,
            ParsedCommand::Schedule {
                interval_hours: 24,
                inner_command_text: "DW ETH_BALANCE".to_string(),
            }
        );
    }

    #[test]
    fn payout_matches_canonical_form() {
        let raw = "DW PAYOUT 10 USDC TO 0xabc";
        assert_eq!(
            parse(raw).unwrap(),
            ParsedCommand::Payout {
                asset: "USDC".to_string(),
                amount: "10".to_string(),
                to: "0xabc".to_string(),
            }
        );
    }

    #[test]
    fn rejects_missing_dw_prefix() {
        let err = parse("SETUP").unwrap_err();
        assert_eq!(err.offending_token, "SETUP");
    }

    #[test]
    fn rejects_unknown_verb() {
        let err = parse("DW FROBNICATE").unwrap_err();
        assert_eq!(err.offending_token, "FROBNICATE");
    }

    #[test]
    fn auto_rebalance_requires_valid_flag() {
        assert!(parse("DW AUTO_REBALANCE ON").is_ok());
        assert!(parse("DW AUTO_REBALANCE MAYBE").is_err());
    }

    #[test]
    fn chain_balance_and_price_round_trip() {
        for raw in ["DW ETH_BALANCE", "DW SOL_PRICE"] {
            assert_eq!(format(&parse(raw).unwrap()), raw);
        }
    }

    #[test]
    fn contract_call_round_trips_with_args() {
        let raw = "DW CONTRACT_CALL ETH 0xdead mint 5 0xfeed";
        assert_eq!(format(&parse(raw).unwrap()), raw);
    }
}
