use sea_query::Iden;

#[derive(Iden, Clone)]
pub enum HealthProfile {
    Table,
    SubjectKey,
    UserId,
    FamilyMemberId,
    Payload,
    UpdatedAt,
}

#[derive(Iden, Clone)]
pub enum RecipeCandidate {
    Table,
    Identifier,
    MealType,
    Title,
    Payload,
}

#[derive(Iden, Clone)]
pub enum UsageRecord {
    Table,
    SubjectKey,
    RecipeIdentifier,
    MealType,
    UsedDate,
}

#[derive(Iden, Clone)]
pub enum MealPlanSlot {
    Table,
    SubjectKey,
    PlanDate,
    MealType,
    RecipeIdentifier,
    Title,
    CalorieTarget,
    Score,
    Payload,
    CreatedAt,
}
