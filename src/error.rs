//! Crate-wide error taxonomy (§7). `SilentDiscard` is deliberately absent
//! from this enum — it is ordinary control flow (a guess rejected by
//! compatibility checking, a model rejected by FLP), never a value
//! propagated as an error.

use crate::id::ID;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HexError {
    /// Malformed input program. Fatal before the core runs; this crate
    /// only constructs it if a caller hands it pre-ground input that
    /// fails a structural check (parsing itself is out of scope).
    #[error("syntax error at {file}:{line}: {message}")]
    Syntax {
        file: String,
        line: usize,
        message: String,
    },

    /// A runtime invariant was broken. Aborts the evaluator.
    #[error("fatal: {message}")]
    Fatal { message: String },

    /// Raised by an external atom. `atom_name` is filled in by
    /// `with_atom_context` at the evaluation boundary if the plugin
    /// itself left it empty.
    #[error("plugin error in external atom '{atom_name}': {message}")]
    Plugin { atom_name: String, message: String },
}

impl HexError {
    pub fn fatal(message: impl Into<String>) -> Self {
        HexError::Fatal {
            message: message.into(),
        }
    }

    pub fn plugin(atom_name: impl Into<String>, message: impl Into<String>) -> Self {
        HexError::Plugin {
            atom_name: atom_name.into(),
            message: message.into(),
        }
    }

    /// Prefixes an originating external atom's name onto a `Plugin`
    /// error that was constructed before the name was known (§7:
    /// "carries the offending atom's name automatically when
    /// propagated").
    pub fn with_atom_context(self, atom_name: &str) -> Self {
        match self {
            HexError::Plugin { message, .. } => HexError::Plugin {
                atom_name: atom_name.to_string(),
                message,
            },
            other => other,
        }
    }

    pub fn bad_arity(atom_name: &str, expected: usize, got: usize) -> Self {
        HexError::Plugin {
            atom_name: atom_name.to_string(),
            message: format!(
                "returned tuple of incompatible size (expected arity {expected}, got {got})"
            ),
        }
    }

    pub fn returned_variable(atom_name: &str) -> Self {
        HexError::Plugin {
            atom_name: atom_name.to_string(),
            message: "returned variable in output tuple".to_string(),
        }
    }

    pub fn aux_collision(symbol: &str) -> Self {
        HexError::fatal(format!(
            "auxiliary symbol collision while minting '{symbol}': a prior registration already claims this name"
        ))
    }

    pub fn wellfounded_limit(unit: ID, cap: usize) -> Self {
        HexError::fatal(format!(
            "wellfounded fixpoint for unit {unit:?} did not converge within {cap} iterations"
        ))
    }

    pub fn wellfounded_nonunique(unit: ID, count: usize) -> Self {
        HexError::fatal(format!(
            "wellfounded unit {unit:?} produced {count} answer sets for its rewritten IDB (expected exactly one)"
        ))
    }
}

pub type HexResult<T> = Result<T, HexError>;
