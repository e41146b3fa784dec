// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Tri-state evaluation result
//!
//! Expression evaluation produces one of three answers: a definitive
//! `True`/`False`, or `NotLoaded` when a required optional collaborator
//! (typically a property tester whose provider is not active) cannot answer
//! yet. `NotLoaded` is a valid result, not an error, and composite
//! expressions must keep it distinct from `False`.

use std::fmt;

/// Result of evaluating an [`Expression`](crate::Expression).
///
/// Combines under `and`/`or` with dominance rules: `False` dominates
/// conjunction, `True` dominates disjunction, and `NotLoaded` is sticky
/// otherwise. Negating `NotLoaded` yields `NotLoaded`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EvaluationResult {
    /// The expression evaluated to false.
    False,
    /// The expression evaluated to true.
    True,
    /// The expression could not be evaluated because a required optional
    /// collaborator is not currently loaded and activation was not forced.
    NotLoaded,
}

impl EvaluationResult {
    /// Conjunction with dominance: `False & x = False`, otherwise
    /// `NotLoaded` wins over `True`.
    pub fn and(self, other: EvaluationResult) -> EvaluationResult {
        match (self, other) {
            (Self::False, _) | (_, Self::False) => Self::False,
            (Self::NotLoaded, _) | (_, Self::NotLoaded) => Self::NotLoaded,
            (Self::True, Self::True) => Self::True,
        }
    }

    /// Disjunction with dominance: `True | x = True`, otherwise
    /// `NotLoaded` wins over `False`.
    pub fn or(self, other: EvaluationResult) -> EvaluationResult {
        match (self, other) {
            (Self::True, _) | (_, Self::True) => Self::True,
            (Self::NotLoaded, _) | (_, Self::NotLoaded) => Self::NotLoaded,
            (Self::False, Self::False) => Self::False,
        }
    }

    /// Logical negation. `NotLoaded` passes through unchanged: the negation
    /// of an unknown answer is still unknown.
    pub fn not(self) -> EvaluationResult {
        match self {
            Self::True => Self::False,
            Self::False => Self::True,
            Self::NotLoaded => Self::NotLoaded,
        }
    }
}

impl From<bool> for EvaluationResult {
    fn from(value: bool) -> Self {
        if value { Self::True } else { Self::False }
    }
}

impl fmt::Display for EvaluationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::False => write!(f, "false"),
            Self::True => write!(f, "true"),
            Self::NotLoaded => write!(f, "not loaded"),
        }
    }
}
