mod health_profile;
mod meal_plan_slot;
mod recipe_candidate;
mod usage_record;
mod usage_record_recipe_idx;

use sqlx_migrator::vec_box;

pub struct Migration;

sqlx_migrator::sqlite_migration!(
    Migration,
    "nutriplan",
    "m0_1",
    vec_box![],
    vec_box![
        health_profile::CreateTable,
        recipe_candidate::CreateTable,
        usage_record::CreateTable,
        usage_record_recipe_idx::Operation,
        meal_plan_slot::CreateTable
    ]
);
