//! The rewrites gomorph ships.
//!
//! | alias | pass | priority |
//! |-------|------|----------|
//! | `struct-flags` | [`StructOfBoolsToFlags`] | 100 |
//! | `field-read` | [`FieldReadToBitwise`] | 200 |
//! | `if-condition` | [`IfConditionToBitwise`] | 210 |
//! | `field-write` | [`FieldWriteToBitwise`] | 220 |
//! | `string-obfuscate` | [`StringLiteralObfuscate`] | 300 |
//! | `jump-table` | [`IfChainToJumpTable`] | 400 |

mod field_read;
mod field_write;
mod fields;
mod if_condition;
mod jump_table;
mod string_obfuscate;
mod struct_flags;

pub use field_read::FieldReadToBitwise;
pub use field_write::FieldWriteToBitwise;
pub use if_condition::IfConditionToBitwise;
pub use jump_table::IfChainToJumpTable;
pub use string_obfuscate::{StringLiteralObfuscate, DENY_LIST};
pub use struct_flags::StructOfBoolsToFlags;

use crate::pass::Pass;

/// Every pass, in default pipeline order.
pub fn all() -> Vec<Box<dyn Pass>> {
    vec![
        Box::new(StructOfBoolsToFlags::new()),
        Box::new(FieldReadToBitwise::new()),
        Box::new(IfConditionToBitwise::new()),
        Box::new(FieldWriteToBitwise::new()),
        Box::new(StringLiteralObfuscate::new()),
        Box::new(IfChainToJumpTable::new()),
    ]
}
