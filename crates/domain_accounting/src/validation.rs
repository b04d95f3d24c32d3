//! Transaction validation
//!
//! Checks run in a fixed order and stop at the first failure:
//!
//! 0. shape: at least one split
//! 1. account roles (`InvalidAccountType`)
//! 2. placeholders (`InvalidAccountingOperation`)
//! 3. entry/exit point pairing (`MalformedTransaction`)
//! 4. system membership (`InvalidAccountingOperation` / `SystemMismatch`)
//! 5. conservation of money (`ConservationViolation`)
//!
//! Nothing here touches the store; a draft that passes can be persisted as is.

use rust_decimal::Decimal;

use crate::account::Account;
use crate::error::AccountingError;
use crate::factory::TransactionDraft;

/// Runs every check against `draft`
pub fn validate_draft(draft: &TransactionDraft) -> Result<(), AccountingError> {
    check_shape(draft)?;
    check_types(draft)?;
    check_placeholders(draft)?;
    check_pairing(draft)?;
    check_systems(draft)?;
    check_conservation(draft)
}

fn check_shape(draft: &TransactionDraft) -> Result<(), AccountingError> {
    if draft.splits.is_empty() {
        return Err(AccountingError::MalformedTransaction(
            "a transaction needs at least one split".to_string(),
        ));
    }
    Ok(())
}

fn check_types(draft: &TransactionDraft) -> Result<(), AccountingError> {
    require_stock(&draft.source, "source")?;
    for split in &draft.splits {
        require_stock(&split.target, "target")?;
        if let Some(exit) = &split.exit_point {
            require_flux(exit, "exit point")?;
        }
        if let Some(entry) = &split.entry_point {
            require_flux(entry, "entry point")?;
        }
    }
    Ok(())
}

fn require_stock(account: &Account, role: &str) -> Result<(), AccountingError> {
    if !account.is_stock() {
        return Err(AccountingError::invalid_type(format!(
            "{} account {} must be stock-like",
            role, account
        )));
    }
    Ok(())
}

fn require_flux(account: &Account, role: &str) -> Result<(), AccountingError> {
    if !account.is_flux() {
        return Err(AccountingError::invalid_type(format!(
            "{} account {} must be flux-like",
            role, account
        )));
    }
    Ok(())
}

fn check_placeholders(draft: &TransactionDraft) -> Result<(), AccountingError> {
    if let Some(account) = draft.accounts().find(|a| a.is_placeholder) {
        return Err(AccountingError::invalid_operation(format!(
            "placeholder account {} cannot take part in a transaction",
            account.path
        )));
    }
    Ok(())
}

fn check_pairing(draft: &TransactionDraft) -> Result<(), AccountingError> {
    for (i, split) in draft.splits.iter().enumerate() {
        if split.entry_point.is_some() != split.exit_point.is_some() {
            return Err(AccountingError::MalformedTransaction(format!(
                "split {} must set both entry and exit points or neither",
                i + 1
            )));
        }
    }
    Ok(())
}

fn check_systems(draft: &TransactionDraft) -> Result<(), AccountingError> {
    let source_system = draft.source.system;

    for (i, split) in draft.splits.iter().enumerate() {
        match (&split.exit_point, &split.entry_point) {
            (Some(exit), Some(entry)) => {
                if exit.system != source_system {
                    return Err(AccountingError::invalid_operation(format!(
                        "exit point {} of split {} is not in the source's accounting system",
                        exit.path,
                        i + 1
                    )));
                }
                if entry.system != split.target.system {
                    return Err(AccountingError::SystemMismatch(format!(
                        "entry point {} of split {} is not in the target's accounting system",
                        entry.path,
                        i + 1
                    )));
                }
            }
            _ => {
                if split.target.system != source_system {
                    return Err(AccountingError::invalid_operation(format!(
                        "internal split {} targets {} in another accounting system",
                        i + 1,
                        split.target.path
                    )));
                }
            }
        }
    }
    Ok(())
}

fn check_conservation(draft: &TransactionDraft) -> Result<(), AccountingError> {
    // Split amounts are target flows: they cancel the source flow exactly.
    let targets: Decimal = draft.splits.iter().map(|s| s.amount).sum();
    if draft.source_amount + targets != Decimal::ZERO {
        return Err(AccountingError::ConservationViolation {
            source_amount: draft.source_amount,
            splits_amount: -targets,
        });
    }
    Ok(())
}
