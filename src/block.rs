//! Data blocks: the capacity side of the privacy budget ledger.

use crate::budget::Budget;

pub type BlockId = u64;

/// A data block with a fixed initial RDP capacity and a running remaining
/// capacity. `available_unlocked_budget` is the slice of `remaining_budget`
/// visible to contention-aware metrics in the current round; it grows
/// monotonically but never exceeds `remaining_budget`, nor `initial_budget`
/// scaled by the unlocking schedule's current fraction.
pub struct Block {
    pub id: BlockId,
    initial_budget: Budget,
    remaining_budget: Budget,
    available_unlocked_budget: Budget,
    n_allocated_tasks: u64,
}

impl Block {
    pub fn new(id: BlockId, initial_budget: Budget) -> Self {
        let zero = Budget::zero(initial_budget.alphas());
        Self {
            id,
            remaining_budget: initial_budget.clone(),
            available_unlocked_budget: zero,
            initial_budget,
            n_allocated_tasks: 0,
        }
    }

    pub fn initial_budget(&self) -> &Budget {
        &self.initial_budget
    }

    pub fn remaining_budget(&self) -> &Budget {
        &self.remaining_budget
    }

    pub fn available_unlocked_budget(&self) -> &Budget {
        &self.available_unlocked_budget
    }

    pub fn n_allocated_tasks(&self) -> u64 {
        self.n_allocated_tasks
    }

    /// True if this block's remaining budget can cover `demand` (see
    /// [`Budget::can_cover`]).
    pub fn can_allocate(&self, demand: &Budget) -> bool {
        self.remaining_budget.can_cover(demand)
    }

    /// Debit `remaining_budget` by `demand`. Callers must have already
    /// checked [`Block::can_allocate`]. The result is kept raw (not clamped
    /// to zero): an alpha order that goes negative here must stay negative,
    /// otherwise a later demand that also clamps to zero at that order would
    /// wrongly look satisfiable forever (`can_cover` compares raw epsilons).
    pub fn allocate(&mut self, demand: &Budget) {
        debug_assert!(self.can_allocate(demand), "allocate called on infeasible demand");
        self.remaining_budget = self.remaining_budget.sub(demand);
        self.n_allocated_tasks += 1;
    }

    /// Advance `available_unlocked_budget` by one step of a progressive
    /// unlocking schedule: grow by `initial_budget / n` per step, capped at
    /// both `remaining_budget` and `initial_budget`.
    pub fn unlock_step(&mut self, n_steps: u32) {
        let n_steps = n_steps.max(1);
        let increment = self.initial_budget.scale(1.0 / n_steps as f64);
        let cap_a = Budget::same_support_min(&self.remaining_budget, &self.initial_budget);
        self.available_unlocked_budget =
            self.available_unlocked_budget.add_with_threshold(&increment, &cap_a);
    }
}

impl Budget {
    /// Componentwise min of two budgets restricted to shared support. Used
    /// to compute the unlocking ceiling `min(remaining_budget, initial_budget)`.
    pub fn same_support_min(a: &Budget, b: &Budget) -> Budget {
        let (alphas, ea, eb) = Budget::same_support(a, b);
        let epsilons: Vec<f64> = ea.iter().zip(eb.iter()).map(|(x, y)| x.min(*y)).collect();
        Budget::from_epsilons(&alphas, &epsilons)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budget::DEFAULT_ALPHAS;

    fn make_block() -> Block {
        let budget = Budget::from_epsilon_delta(DEFAULT_ALPHAS, 10.0, 1e-7);
        Block::new(0, budget)
    }

    #[test]
    fn allocate_debits_remaining_budget() {
        let mut block = make_block();
        let demand = Budget::from_epsilons(DEFAULT_ALPHAS, &vec![1.0; DEFAULT_ALPHAS.len()]);
        assert!(block.can_allocate(&demand));
        block.allocate(&demand);
        assert_eq!(block.n_allocated_tasks(), 1);
        for &alpha in DEFAULT_ALPHAS {
            assert!(block.remaining_budget().epsilon(alpha) <= block.initial_budget().epsilon(alpha));
        }
    }

    #[test]
    fn unlock_step_is_monotone_and_bounded() {
        let mut block = make_block();
        let mut previous = block.available_unlocked_budget().clone();
        for _ in 0..5 {
            block.unlock_step(10);
            for &alpha in DEFAULT_ALPHAS {
                let now = block.available_unlocked_budget().epsilon(alpha);
                assert!(now + 1e-9 >= previous.epsilon(alpha));
                assert!(now <= block.remaining_budget().epsilon(alpha) + 1e-9);
            }
            previous = block.available_unlocked_budget().clone();
        }
    }

    #[test]
    fn unlock_never_exceeds_full_capacity_after_many_steps() {
        let mut block = make_block();
        for _ in 0..1000 {
            block.unlock_step(10);
        }
        for &alpha in DEFAULT_ALPHAS {
            assert!(
                block.available_unlocked_budget().epsilon(alpha)
                    <= block.remaining_budget().epsilon(alpha) + 1e-9
            );
        }
    }
}
