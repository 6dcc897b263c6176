use nutriplan_nutrition::MealSlotTarget;
use nutriplan_shared::mealplan::SubjectKey;
use nutriplan_shared::recipe::RecipeCandidate;
use nutriplan_shared::{Error, Result};
use strum::{AsRefStr, Display};

use crate::{
    DEFAULT_DEDUP_WINDOW_DAYS, RecipeScorer, ScoredCandidate, UsageHistoryLedger, UsageSnapshot,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum SelectionState {
    Pending,
    Scoring,
    Relaxing,
    Selected,
    Exhausted,
}

/// Dedup windows tried in order: the configured window halved until it reaches 0.
pub fn relaxation_windows(window_days: u32) -> Vec<u32> {
    let mut windows = vec![window_days, window_days / 2, window_days / 4, 0];
    windows.dedup();

    windows
}

#[derive(Clone, Debug, PartialEq)]
pub struct Selection {
    pub chosen: ScoredCandidate,
    /// Dedup window the pick survived; smaller than configured when relaxed
    pub window_days: u32,
    /// Eligible candidates at that window, best first
    pub ranked: Vec<ScoredCandidate>,
}

pub struct RecipeSelector<'a> {
    scorer: &'a RecipeScorer<'a>,
    window_days: u32,
}

impl<'a> RecipeSelector<'a> {
    pub fn new(scorer: &'a RecipeScorer<'a>) -> Self {
        Self {
            scorer,
            window_days: DEFAULT_DEDUP_WINDOW_DAYS,
        }
    }

    pub fn window_days(mut self, days: u32) -> Self {
        self.window_days = days;
        self
    }

    /// Hard filter: drops every candidate carrying an excluded ingredient.
    pub fn eligible<'c>(&self, pool: &'c [RecipeCandidate]) -> Vec<&'c RecipeCandidate> {
        pool.iter().filter(|c| !self.scorer.is_excluded(c)).collect()
    }

    /// Soft filter: drops candidates used within `window_days`.
    pub fn fresh<'c>(
        candidates: &[&'c RecipeCandidate],
        usage: &UsageSnapshot,
        window_days: u32,
    ) -> Vec<&'c RecipeCandidate> {
        let used = usage.recently_used(window_days);

        candidates
            .iter()
            .filter(|c| !used.contains(c.identifier().as_str()))
            .copied()
            .collect()
    }

    pub fn select(
        &self,
        slot: &MealSlotTarget,
        pool: &[RecipeCandidate],
        usage: &UsageSnapshot,
    ) -> Result<Selection> {
        let mut state = SelectionState::Pending;
        let eligible = self.eligible(pool);

        tracing::debug!(
            meal_type = %slot.meal_type,
            %state,
            pool = pool.len(),
            eligible = eligible.len(),
            "selecting recipe"
        );

        for window_days in relaxation_windows(self.window_days) {
            if state == SelectionState::Relaxing {
                tracing::debug!(meal_type = %slot.meal_type, %state, window_days, "relaxing dedup window");
            }

            let fresh = Self::fresh(&eligible, usage, window_days);
            if fresh.is_empty() {
                state = SelectionState::Relaxing;
                continue;
            }

            state = SelectionState::Scoring;
            tracing::debug!(meal_type = %slot.meal_type, %state, window_days, candidates = fresh.len(), "scoring candidates");
            let ranked = self.scorer.rank(slot, fresh);

            let Some(chosen) = ranked.first().cloned() else {
                state = SelectionState::Relaxing;
                continue;
            };

            state = SelectionState::Selected;
            tracing::debug!(
                meal_type = %slot.meal_type,
                %state,
                window_days,
                recipe = %chosen.identifier,
                score = chosen.score,
                "recipe selected"
            );

            return Ok(Selection {
                chosen,
                window_days,
                ranked,
            });
        }

        state = SelectionState::Exhausted;
        tracing::debug!(meal_type = %slot.meal_type, %state, "no eligible recipe");

        Err(Error::NoEligibleRecipe {
            meal_type: slot.meal_type,
            excluded: self.scorer.profile().excluded_ingredients.clone(),
        })
    }

    /// Select then record the pick in the ledger. A failed ledger write is logged and
    /// never fails the selection.
    pub async fn select_and_record(
        &self,
        slot: &MealSlotTarget,
        pool: &[RecipeCandidate],
        ledger: &UsageHistoryLedger,
        subject: &SubjectKey,
        attempts: u32,
    ) -> Result<Selection> {
        let usage = ledger.snapshot(subject, today_utc()).await?;
        let selection = self.select(slot, pool, &usage)?;

        if let Err(err) = ledger
            .record_with_retry(
                subject,
                &selection.chosen.identifier,
                slot.meal_type,
                usage.today(),
                attempts,
            )
            .await
        {
            tracing::error!(subject = %subject, meal_type = %slot.meal_type, err = %err, "failed to record recipe usage");
        }

        Ok(selection)
    }
}

pub(crate) fn today_utc() -> time::Date {
    time::OffsetDateTime::now_utc().date()
}
