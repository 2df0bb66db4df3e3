/*!
# Pre-flight Validation

Checks a loosely typed operation list before anything touches the network and
converts it into typed [`Operation`]s. Every problem found is reported; the
list is never partially accepted.
*/

use crate::{
    error::{TxBatchError, TxBatchResult},
    operation::{Operation, OperationParams, OperationType, SlippageQuote},
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use solana_sdk::pubkey::Pubkey;
use std::{collections::HashSet, str::FromStr};

/// Slippage applied to a quote when `slippageBps` is not given
pub const DEFAULT_SLIPPAGE_BPS: u16 = 100;

/// Operation as read from an operations file, before validation.
///
/// Fields stay untyped so a wrongly shaped entry still reaches
/// [`validate_operations`] and shows up in its report.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RawOperation {
    #[serde(default)]
    pub id: Option<Value>,

    #[serde(default, rename = "type")]
    pub operation_type: Option<Value>,

    #[serde(default)]
    pub description: Option<Value>,

    #[serde(default)]
    pub params: Option<Value>,
}

/// Outcome of [`validate_operations`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl ValidationReport {
    fn from_errors(errors: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }
}

/// Validate an operation list against the closed set of `valid_types`.
///
/// Checks, in order: the list is non-empty, each operation carries
/// type/id/description/params, the type is known, ids are unique, and the
/// type-specific parameters are present and parse.
pub fn validate_operations(operations: &[RawOperation], valid_types: &[&str]) -> ValidationReport {
    let mut errors = Vec::new();

    if operations.is_empty() {
        errors.push("Operation list is empty".to_string());
        return ValidationReport::from_errors(errors);
    }

    let mut seen_ids = HashSet::new();
    let mut reported_duplicates = HashSet::new();

    for (index, raw) in operations.iter().enumerate() {
        let label = match raw.id_str() {
            Some(id) => format!("Operation {} ('{}')", index, id),
            None => format!("Operation {}", index),
        };

        match present(&raw.id) {
            None => errors.push(format!("{}: missing id", label)),
            Some(Value::String(id)) if id.is_empty() => {
                errors.push(format!("{}: missing id", label))
            }
            Some(Value::String(id)) => {
                if !seen_ids.insert(id.as_str()) && reported_duplicates.insert(id.as_str()) {
                    errors.push(format!("Duplicate operation id '{}'", id));
                }
            }
            Some(_) => errors.push(format!("{}: id must be a string", label)),
        }
        match present(&raw.description) {
            None => errors.push(format!("{}: missing description", label)),
            Some(Value::String(_)) => {}
            Some(_) => errors.push(format!("{}: description must be a string", label)),
        }

        let type_name = match present(&raw.operation_type) {
            None => {
                errors.push(format!("{}: missing type", label));
                continue;
            }
            Some(Value::String(type_name)) => type_name.as_str(),
            Some(_) => {
                errors.push(format!("{}: type must be a string", label));
                continue;
            }
        };
        if !valid_types.contains(&type_name) {
            errors.push(format!(
                "{}: invalid type '{}' (expected one of: {})",
                label,
                type_name,
                valid_types.join(", ")
            ));
            continue;
        }

        let params = match present(&raw.params) {
            None => {
                errors.push(format!("{}: missing params", label));
                continue;
            }
            Some(Value::Object(params)) => params,
            Some(_) => {
                errors.push(format!("{}: params must be an object", label));
                continue;
            }
        };

        // A valid type string outside the engine's own set cannot be typed
        let Ok(operation_type) = OperationType::from_str(type_name) else {
            errors.push(format!("{}: type '{}' is not supported", label, type_name));
            continue;
        };
        errors.extend(
            param_errors(operation_type, params)
                .into_iter()
                .map(|e| format!("{}: {}", label, e)),
        );
    }

    ValidationReport::from_errors(errors)
}

/// Validate with the engine's own type set, then convert to typed operations
pub fn parse_operations(operations: &[RawOperation]) -> Result<Vec<Operation>, ValidationReport> {
    let valid_types = crate::operation::valid_type_names();
    let report = validate_operations(operations, &valid_types);
    if !report.valid {
        return Err(report);
    }

    let mut parsed = Vec::with_capacity(operations.len());
    let mut errors = Vec::new();
    for raw in operations {
        match raw.to_operation() {
            Ok(operation) => parsed.push(operation),
            Err(e) => errors.push(e.to_string()),
        }
    }

    if errors.is_empty() {
        Ok(parsed)
    } else {
        Err(ValidationReport::from_errors(errors))
    }
}

/// Reject duplicate ids among already typed operations
pub fn ensure_unique_ids(operations: &[Operation]) -> TxBatchResult<()> {
    let mut seen = HashSet::new();
    for operation in operations {
        if !seen.insert(operation.id.as_str()) {
            return Err(TxBatchError::DuplicateOperationId(operation.id.clone()));
        }
    }
    Ok(())
}

impl RawOperation {
    pub fn id_str(&self) -> Option<&str> {
        self.id.as_ref().and_then(Value::as_str)
    }

    pub fn type_name(&self) -> Option<&str> {
        self.operation_type.as_ref().and_then(Value::as_str)
    }

    /// Convert a single raw operation; the sender is bound later by the caller
    pub fn to_operation(&self) -> TxBatchResult<Operation> {
        let id = self
            .id_str()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| TxBatchError::Validation(vec!["missing or non-string id".to_string()]))?
            .to_string();
        let type_name = self.type_name().ok_or_else(|| {
            TxBatchError::Validation(vec![format!("Operation '{}': missing type", id)])
        })?;
        let operation_type = OperationType::from_str(type_name)
            .map_err(|e| TxBatchError::Validation(vec![format!("Operation '{}': {}", id, e)]))?;
        let params = self
            .params
            .as_ref()
            .and_then(Value::as_object)
            .ok_or_else(|| {
                TxBatchError::Validation(vec![format!("Operation '{}': missing params", id)])
            })?;

        let typed = typed_params(operation_type, params).map_err(|errors| {
            TxBatchError::Validation(
                errors
                    .into_iter()
                    .map(|e| format!("Operation '{}': {}", id, e))
                    .collect(),
            )
        })?;

        let description = self
            .description
            .as_ref()
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Ok(Operation::new(id, description, typed))
    }
}

/// A field that is absent or explicitly null counts as missing
fn present(field: &Option<Value>) -> Option<&Value> {
    field.as_ref().filter(|value| !value.is_null())
}

fn param_errors(operation_type: OperationType, params: &Map<String, Value>) -> Vec<String> {
    match typed_params(operation_type, params) {
        Ok(_) => Vec::new(),
        Err(errors) => errors,
    }
}

fn typed_params(
    operation_type: OperationType,
    params: &Map<String, Value>,
) -> Result<OperationParams, Vec<String>> {
    let missing: Vec<String> = operation_type
        .required_params()
        .iter()
        .filter(|key| params.get(**key).map_or(true, Value::is_null))
        .map(|key| {
            format!(
                "missing required param '{}' for type '{}'",
                key, operation_type
            )
        })
        .collect();
    if !missing.is_empty() {
        return Err(missing);
    }

    let mut errors = Vec::new();
    let mut pubkey = |key: &str| match read_pubkey(params, key) {
        Ok(value) => value,
        Err(e) => {
            errors.push(e);
            Pubkey::default()
        }
    };

    let params = match operation_type {
        OperationType::Transfer => {
            let recipient = pubkey("recipient");
            let mint = pubkey("mint");
            OperationParams::Transfer {
                recipient,
                mint,
                amount: record(&mut errors, read_amount(params, "amount")),
            }
        }
        OperationType::SolTransfer => {
            let recipient = pubkey("recipient");
            OperationParams::SolTransfer {
                recipient,
                lamports: record(&mut errors, read_amount(params, "amount")),
            }
        }
        OperationType::BuyBondingCurve | OperationType::SellBondingCurve => {
            let mint = pubkey("mint");
            let token_amount = record(&mut errors, read_amount(params, "amount"));
            let quote = record(&mut errors, read_quote(params, "solAmount"));
            if operation_type == OperationType::BuyBondingCurve {
                OperationParams::BuyBondingCurve {
                    mint,
                    token_amount,
                    quote,
                }
            } else {
                OperationParams::SellBondingCurve {
                    mint,
                    token_amount,
                    quote,
                }
            }
        }
        OperationType::BuyAmm | OperationType::SellAmm => {
            let pool = pubkey("poolKey");
            let base_amount = record(&mut errors, read_amount(params, "amount"));
            let quote = record(&mut errors, read_quote(params, "quoteAmount"));
            if operation_type == OperationType::BuyAmm {
                OperationParams::BuyAmm {
                    pool,
                    base_amount,
                    quote,
                }
            } else {
                OperationParams::SellAmm {
                    pool,
                    base_amount,
                    quote,
                }
            }
        }
    };

    if errors.is_empty() {
        Ok(params)
    } else {
        Err(errors)
    }
}

fn record<T: Default>(errors: &mut Vec<String>, result: Result<T, String>) -> T {
    result.unwrap_or_else(|e| {
        errors.push(e);
        T::default()
    })
}

fn read_pubkey(params: &Map<String, Value>, key: &str) -> Result<Pubkey, String> {
    let value = params
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| format!("param '{}' must be a base58 public key string", key))?;
    Pubkey::from_str(value).map_err(|_| format!("param '{}' is not a valid public key: {}", key, value))
}

fn read_amount(params: &Map<String, Value>, key: &str) -> Result<u64, String> {
    match params.get(key) {
        Some(Value::Number(n)) => n
            .as_u64()
            .ok_or_else(|| format!("param '{}' must be a non-negative integer", key)),
        Some(Value::String(s)) => s
            .trim()
            .parse::<u64>()
            .map_err(|_| format!("param '{}' is not a valid amount: {}", key, s)),
        _ => Err(format!("param '{}' must be a number or numeric string", key)),
    }
}

fn read_quote(params: &Map<String, Value>, key: &str) -> Result<Option<SlippageQuote>, String> {
    if params.get(key).map_or(true, Value::is_null) {
        return Ok(None);
    }
    let quoted_amount = read_amount(params, key)?;
    let slippage_bps = if params.get("slippageBps").map_or(true, Value::is_null) {
        DEFAULT_SLIPPAGE_BPS
    } else {
        let bps = read_amount(params, "slippageBps")?;
        u16::try_from(bps).map_err(|_| format!("param 'slippageBps' out of range: {}", bps))?
    };
    Ok(Some(SlippageQuote::new(quoted_amount, slippage_bps)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::valid_type_names;
    use serde_json::json;

    fn raw(id: &str, operation_type: &str, params: Value) -> RawOperation {
        RawOperation {
            id: Some(json!(id)),
            operation_type: Some(json!(operation_type)),
            description: Some(json!(format!("{} {}", operation_type, id))),
            params: Some(params),
        }
    }

    fn transfer(id: &str) -> RawOperation {
        raw(
            id,
            "transfer",
            json!({
                "recipient": Pubkey::new_unique().to_string(),
                "mint": Pubkey::new_unique().to_string(),
                "amount": 1_000,
            }),
        )
    }

    #[test]
    fn test_valid_transfers_pass() {
        let ops: Vec<_> = (0..3).map(|i| transfer(&format!("op{}", i))).collect();
        let report = validate_operations(&ops, &valid_type_names());
        assert!(report.valid, "{:?}", report.errors);
        assert!(report.errors.is_empty());
    }

    #[test]
    fn test_empty_list_is_invalid() {
        let report = validate_operations(&[], &valid_type_names());
        assert!(!report.valid);
        assert_eq!(report.errors, vec!["Operation list is empty".to_string()]);
    }

    #[test]
    fn test_missing_amount_names_the_field() {
        let op = raw(
            "op1",
            "transfer",
            json!({
                "recipient": Pubkey::new_unique().to_string(),
                "mint": Pubkey::new_unique().to_string(),
            }),
        );
        let report = validate_operations(&[op], &valid_type_names());
        assert!(!report.valid);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("'amount'"));
    }

    #[test]
    fn test_duplicate_ids_reported_once() {
        let ops = vec![
            transfer("op1"),
            transfer("op2"),
            transfer("op1"),
            transfer("op3"),
            transfer("op4"),
        ];
        let report = validate_operations(&ops, &valid_type_names());
        assert!(!report.valid);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("Duplicate"));
        assert!(report.errors[0].contains("\"op1\"") || report.errors[0].contains("'op1'"));
    }

    #[test]
    fn test_unknown_type_and_missing_fields() {
        let mut unknown = transfer("a");
        unknown.operation_type = Some(json!("swap"));
        let mut bare = transfer("b");
        bare.description = None;
        bare.params = None;

        let report = validate_operations(&[unknown, bare], &valid_type_names());
        assert!(!report.valid);
        assert!(report.errors.iter().any(|e| e.contains("invalid type 'swap'")));
        assert!(report.errors.iter().any(|e| e.contains("missing description")));
        assert!(report.errors.iter().any(|e| e.contains("missing params")));
    }

    #[test]
    fn test_wrongly_shaped_fields_are_reported() {
        let mut numeric_id = transfer("a");
        numeric_id.id = Some(json!(1));
        let mut scalar_params = transfer("b");
        scalar_params.params = Some(json!("oops"));
        let mut list_type = transfer("c");
        list_type.operation_type = Some(json!(["transfer"]));
        let mut numeric_description = transfer("d");
        numeric_description.description = Some(json!(7));

        let report = validate_operations(
            &[numeric_id, scalar_params, list_type, numeric_description],
            &valid_type_names(),
        );
        assert!(!report.valid);
        assert_eq!(
            report.errors,
            vec![
                "Operation 0: id must be a string".to_string(),
                "Operation 1 ('b'): params must be an object".to_string(),
                "Operation 2 ('c'): type must be a string".to_string(),
                "Operation 3 ('d'): description must be a string".to_string(),
            ]
        );
        assert!(parse_operations(&[transfer("ok"), {
            let mut bad = transfer("bad");
            bad.params = Some(json!(42));
            bad
        }])
        .is_err());
    }

    #[test]
    fn test_null_fields_count_as_missing() {
        let mut op = transfer("a");
        op.description = Some(Value::Null);
        op.params = Some(Value::Null);
        let report = validate_operations(&[op], &valid_type_names());
        assert!(report.errors.iter().any(|e| e.contains("missing description")));
        assert!(report.errors.iter().any(|e| e.contains("missing params")));
    }

    #[test]
    fn test_restricted_type_set() {
        let op = raw(
            "op1",
            "sol-transfer",
            json!({ "recipient": Pubkey::new_unique().to_string(), "amount": 5 }),
        );
        let report = validate_operations(&[op], &["transfer"]);
        assert!(!report.valid);
        assert!(report.errors[0].contains("invalid type 'sol-transfer'"));
    }

    #[test]
    fn test_buy_amm_requires_pool_key() {
        let op = raw("amm", "buy-amm", json!({ "amount": "42" }));
        let report = validate_operations(&[op], &valid_type_names());
        assert!(!report.valid);
        assert!(report.errors[0].contains("'poolKey'"));
    }

    #[test]
    fn test_bad_pubkey_and_amount() {
        let op = raw(
            "op1",
            "sol-transfer",
            json!({ "recipient": "not-a-key", "amount": -3 }),
        );
        let report = validate_operations(&[op], &valid_type_names());
        assert_eq!(report.errors.len(), 2);
        assert!(report.errors[0].contains("recipient"));
        assert!(report.errors[1].contains("amount"));
    }

    #[test]
    fn test_parse_typed_operations() {
        let pool = Pubkey::new_unique();
        let ops = vec![
            transfer("t1"),
            raw(
                "amm1",
                "sell-amm",
                json!({
                    "poolKey": pool.to_string(),
                    "amount": "1000",
                    "quoteAmount": 2_000,
                    "slippageBps": 50,
                }),
            ),
            raw(
                "bc1",
                "buy-bonding-curve",
                json!({
                    "mint": Pubkey::new_unique().to_string(),
                    "amount": 10,
                    "solAmount": 100,
                }),
            ),
        ];

        let parsed = parse_operations(&ops).unwrap();
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed[0].operation_type(), OperationType::Transfer);
        assert_eq!(
            parsed[1].params,
            OperationParams::SellAmm {
                pool,
                base_amount: 1000,
                quote: Some(SlippageQuote::new(2_000, 50)),
            }
        );
        match &parsed[2].params {
            OperationParams::BuyBondingCurve { quote, .. } => {
                assert_eq!(quote.unwrap().slippage_bps, DEFAULT_SLIPPAGE_BPS)
            }
            other => panic!("unexpected params {:?}", other),
        }
    }

    #[test]
    fn test_ensure_unique_ids() {
        let ops = parse_operations(&[transfer("a"), transfer("b")]).unwrap();
        assert!(ensure_unique_ids(&ops).is_ok());

        let mut dup = ops.clone();
        dup.push(ops[0].clone());
        assert!(matches!(
            ensure_unique_ids(&dup),
            Err(TxBatchError::DuplicateOperationId(id)) if id == "a"
        ));
    }
}
