//! Encumbrance check.
//!
//! An encumbered state may only be consumed together with the state it is
//! encumbered by: if an input names encumbrance index `e`, the transaction
//! must also consume output `e` of the same originating transaction.
//! Newly created outputs may only name another existing output.

use crate::domain::entities::ContractVerificationFailure;
use shared_types::entities::{LedgerTransaction, StateRef};
use std::collections::HashSet;

/// Contract class name used for failures raised by this check.
pub const ENCUMBRANCE_CHECK: &str = "encumbrance";

const MISSING_ENCUMBRANCE: &str = "TransactionMissingEncumbrance";
const INVALID_ENCUMBRANCE: &str = "TransactionInvalidEncumbrance";

/// Return one failure per violated encumbrance, inputs first.
pub fn check_encumbrances(transaction: &LedgerTransaction) -> Vec<ContractVerificationFailure> {
    let consumed: HashSet<StateRef> = transaction
        .inputs
        .iter()
        .map(|input| input.reference)
        .collect();

    let mut failures = Vec::new();

    for input in &transaction.inputs {
        let Some(index) = input.state.encumbrance else {
            continue;
        };
        let required = StateRef::new(input.reference.transaction_id, index);
        if !consumed.contains(&required) {
            failures.push(failure(
                &input.state.data.state_class,
                MISSING_ENCUMBRANCE,
                format!(
                    "Input {} is encumbered by {} which is not consumed by transaction {}",
                    input.reference, required, transaction.id
                ),
            ));
        }
    }

    let output_count = transaction.outputs.len();
    for (position, output) in transaction.outputs.iter().enumerate() {
        let Some(index) = output.encumbrance else {
            continue;
        };
        let target = index as usize;
        if target >= output_count || target == position {
            failures.push(failure(
                &output.data.state_class,
                INVALID_ENCUMBRANCE,
                format!(
                    "Output {position} names encumbrance {index} but the transaction has {output_count} outputs"
                ),
            ));
        }
    }

    failures
}

fn failure(state_class: &str, kind: &str, message: String) -> ContractVerificationFailure {
    ContractVerificationFailure {
        contract_class_name: ENCUMBRANCE_CHECK.to_string(),
        contract_state_class_names: vec![state_class.to_string()],
        exception_class_name: kind.to_string(),
        exception_message: message,
    }
}
