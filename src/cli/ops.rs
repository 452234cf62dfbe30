//! CLI command listing the mutation operator space.

// Keep the uniform Result signature the other subcommands use
#![allow(clippy::unnecessary_wraps)]

use crate::cli::CliError;
use banditsearch::operators::{Operator, OperatorCategory, OperatorSet};

/// Execute the ops command.
pub(crate) fn execute() -> Result<(), CliError> {
    println!("Available operators:");
    println!();

    let categories = [
        ("Statement", OperatorCategory::Statement),
        ("Matched", OperatorCategory::Matched),
        ("Node modification", OperatorCategory::ModifyNode),
        ("Model-driven", OperatorCategory::Llm),
    ];

    for (label, category) in categories {
        let members: Vec<Operator> = Operator::ALL
            .into_iter()
            .filter(|op| op.category() == category)
            .collect();
        println!("{label} operators ({}):", members.len());
        for op in members {
            if op.is_learned() {
                println!("  - {op} (learned)");
            } else {
                println!("  - {op}");
            }
        }
        println!();
    }

    println!("Total: {} operators", Operator::ALL.len());
    println!();
    println!("Operator sets:");
    for set in [
        OperatorSet::Statement,
        OperatorSet::Matched,
        OperatorSet::ModifyNode,
        OperatorSet::Traditional,
        OperatorSet::Llm,
        OperatorSet::All,
    ] {
        println!("  {:<14} {} operators", set.as_str(), set.operators().len());
    }

    Ok(())
}
