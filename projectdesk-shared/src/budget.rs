//! Task budget roll-up
//!
//! A project carries a budget and every task under it may claim part of it.
//! The sum of all task budgets in a project must never exceed the project's
//! budget. Amounts are integer minor units (e.g. cents).
//!
//! The checks here are pure arithmetic. Callers read the project budget and
//! the sibling total inside the same transaction that writes the task (see
//! `Project::lock_budget` and `Task::allocated_budget`).
//!
//! # Example
//!
//! ```
//! use projectdesk_shared::budget::{BudgetCheck, BudgetError};
//!
//! // Project budget 10_000, other tasks already claim 7_500.
//! let check = BudgetCheck::evaluate(10_000, 7_500, 2_500).unwrap();
//! assert_eq!(check.remaining, 0);
//!
//! let err = BudgetCheck::evaluate(10_000, 7_500, 2_501).unwrap_err();
//! assert!(matches!(err, BudgetError::Exceeded { .. }));
//! ```

/// Budget rule violation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BudgetError {
    /// Siblings plus the requested amount overshoot the project budget
    #[error(
        "Task budget exceeds the remaining project budget \
         (project budget {project_budget}, already allocated {allocated}, requested {requested})"
    )]
    Exceeded {
        project_budget: i64,
        allocated: i64,
        requested: i64,
    },

    /// The project budget would drop below what its tasks already claim
    #[error("Project budget {budget} is below the {allocated} already allocated to its tasks")]
    BelowAllocated { budget: i64, allocated: i64 },

    /// Budgets are never negative
    #[error("Budget must not be negative (got {0})")]
    Negative(i64),
}

/// Outcome of a successful roll-up check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BudgetCheck {
    /// Project budget
    pub project_budget: i64,

    /// Sum of the other tasks' budgets plus the requested amount
    pub allocated: i64,

    /// Budget left after this allocation
    pub remaining: i64,
}

impl BudgetCheck {
    /// Checks whether `requested` fits next to `sibling_total` under `project_budget`.
    ///
    /// `sibling_total` must exclude the task being written, so an update that
    /// keeps its own budget unchanged always passes.
    pub fn evaluate(
        project_budget: i64,
        sibling_total: i64,
        requested: i64,
    ) -> Result<Self, BudgetError> {
        for amount in [project_budget, sibling_total, requested] {
            if amount < 0 {
                return Err(BudgetError::Negative(amount));
            }
        }

        let exceeded = BudgetError::Exceeded {
            project_budget,
            allocated: sibling_total,
            requested,
        };

        // Overflow can only happen far above any real project budget.
        let allocated = sibling_total.checked_add(requested).ok_or(exceeded.clone())?;
        if allocated > project_budget {
            return Err(exceeded);
        }

        Ok(Self {
            project_budget,
            allocated,
            remaining: project_budget - allocated,
        })
    }
}

/// Checks that a new project budget still covers its tasks.
pub fn ensure_project_budget_covers(budget: i64, allocated: i64) -> Result<(), BudgetError> {
    if budget < 0 {
        return Err(BudgetError::Negative(budget));
    }
    if allocated > budget {
        return Err(BudgetError::BelowAllocated { budget, allocated });
    }
    Ok(())
}
