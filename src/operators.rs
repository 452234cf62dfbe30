//! Mutation operator identifiers and the operator space.
//!
//! Operators are opaque, stable identifiers for mutation kinds. The
//! selection algorithms never need operator-specific behaviour, only
//! identity and a fixed metadata lookup, so the space is a closed enum
//! with static descriptors rather than a trait hierarchy. The actual
//! patch derivation for each kind lives behind the
//! [`SearchDomain`](crate::search::SearchDomain) collaborator.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of a mutation operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperatorCategory {
    /// Whole-statement edits (delete, copy, replace, swap, move).
    Statement,
    /// Type-aware statement edits that only pair statements of the same
    /// syntactic kind.
    Matched,
    /// Single-node edits such as binary/unary operator replacement.
    ModifyNode,
    /// Model-driven rewrites produced by a language model.
    Llm,
}

impl OperatorCategory {
    /// Short lowercase name used in exports and experiment ids.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Statement => "statement",
            Self::Matched => "matched",
            Self::ModifyNode => "modifynode",
            Self::Llm => "llm",
        }
    }
}

impl fmt::Display for OperatorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A mutation operator: one arm of the bandit.
///
/// The set is fixed for the lifetime of a selector; operators carry no
/// behaviour here, only identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    /// Delete a statement.
    DeleteStatement,
    /// Copy a statement to another location.
    CopyStatement,
    /// Replace a statement with another.
    ReplaceStatement,
    /// Swap two statements.
    SwapStatement,
    /// Move a statement to another location.
    MoveStatement,
    /// Delete a statement, type-aware.
    MatchedDeleteStatement,
    /// Copy a statement over one of the same syntactic kind.
    MatchedCopyStatement,
    /// Replace a statement with one of the same syntactic kind.
    MatchedReplaceStatement,
    /// Swap two statements of the same syntactic kind.
    MatchedSwapStatement,
    /// Replace a binary operator node (e.g. `+` with `-`).
    BinaryOperatorReplacement,
    /// Replace a unary operator node (e.g. `!` with `-`).
    UnaryOperatorReplacement,
    /// Mask part of a statement and have a model fill it in.
    LlmMaskedStatement,
    /// Have a model propose an alternative statement.
    LlmReplaceStatement,
}

impl Operator {
    /// Every operator, in the canonical iteration order used for
    /// tie-breaking and exports.
    pub const ALL: [Self; 13] = [
        Self::DeleteStatement,
        Self::CopyStatement,
        Self::ReplaceStatement,
        Self::SwapStatement,
        Self::MoveStatement,
        Self::MatchedDeleteStatement,
        Self::MatchedCopyStatement,
        Self::MatchedReplaceStatement,
        Self::MatchedSwapStatement,
        Self::BinaryOperatorReplacement,
        Self::UnaryOperatorReplacement,
        Self::LlmMaskedStatement,
        Self::LlmReplaceStatement,
    ];

    /// Stable operator name used in logs and exports.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::DeleteStatement => "DeleteStatement",
            Self::CopyStatement => "CopyStatement",
            Self::ReplaceStatement => "ReplaceStatement",
            Self::SwapStatement => "SwapStatement",
            Self::MoveStatement => "MoveStatement",
            Self::MatchedDeleteStatement => "MatchedDeleteStatement",
            Self::MatchedCopyStatement => "MatchedCopyStatement",
            Self::MatchedReplaceStatement => "MatchedReplaceStatement",
            Self::MatchedSwapStatement => "MatchedSwapStatement",
            Self::BinaryOperatorReplacement => "BinaryOperatorReplacement",
            Self::UnaryOperatorReplacement => "UnaryOperatorReplacement",
            Self::LlmMaskedStatement => "LlmMaskedStatement",
            Self::LlmReplaceStatement => "LlmReplaceStatement",
        }
    }

    /// Category this operator belongs to.
    #[must_use]
    pub fn category(self) -> OperatorCategory {
        match self {
            Self::DeleteStatement
            | Self::CopyStatement
            | Self::ReplaceStatement
            | Self::SwapStatement
            | Self::MoveStatement => OperatorCategory::Statement,
            Self::MatchedDeleteStatement
            | Self::MatchedCopyStatement
            | Self::MatchedReplaceStatement
            | Self::MatchedSwapStatement => OperatorCategory::Matched,
            Self::BinaryOperatorReplacement | Self::UnaryOperatorReplacement => {
                OperatorCategory::ModifyNode
            }
            Self::LlmMaskedStatement | Self::LlmReplaceStatement => OperatorCategory::Llm,
        }
    }

    /// True for model-driven operators, false for classical ones.
    #[must_use]
    pub fn is_learned(self) -> bool {
        self.category() == OperatorCategory::Llm
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Named subsets of the operator space, selectable by category name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperatorSet {
    /// Whole-statement operators only.
    Statement,
    /// Matched statement operators only.
    Matched,
    /// Node modification operators only.
    ModifyNode,
    /// All classical operators (statement + matched + modify-node).
    Traditional,
    /// Model-driven operators only.
    Llm,
    /// The full operator space.
    All,
}

impl OperatorSet {
    /// Short lowercase name used in exports and experiment ids.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Statement => "statement",
            Self::Matched => "matched",
            Self::ModifyNode => "modifynode",
            Self::Traditional => "traditional",
            Self::Llm => "llm",
            Self::All => "all",
        }
    }

    /// Resolve the set to its operators, in canonical order.
    #[must_use]
    pub fn operators(self) -> Vec<Operator> {
        Operator::ALL
            .into_iter()
            .filter(|op| match self {
                Self::Statement => op.category() == OperatorCategory::Statement,
                Self::Matched => op.category() == OperatorCategory::Matched,
                Self::ModifyNode => op.category() == OperatorCategory::ModifyNode,
                Self::Traditional => !op.is_learned(),
                Self::Llm => op.is_learned(),
                Self::All => true,
            })
            .collect()
    }
}

impl fmt::Display for OperatorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
