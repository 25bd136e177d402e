use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;

use crate::auth::gate::Owned;

/// Parent row of the `workouts` table.
#[derive(Debug, Clone, FromRow)]
pub struct WorkoutRow {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub description: String,
    pub duration_minutes: i32,
    pub calories_burned: i32,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct WorkoutEntry {
    pub id: i64,
    pub exercise_name: String,
    pub sets: i32,
    pub reps: Option<i32>,
    pub duration_seconds: Option<i32>,
    pub weight: Option<f64>,
    pub notes: String,
    pub order_index: i32,
}

/// The aggregate: a workout with its entries sorted by `order_index`.
#[derive(Debug, Clone, Serialize)]
pub struct Workout {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub description: String,
    pub duration_minutes: i32,
    pub calories_burned: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    pub entries: Vec<WorkoutEntry>,
}

impl Workout {
    pub fn from_parts(row: WorkoutRow, mut entries: Vec<WorkoutEntry>) -> Self {
        entries.sort_by_key(|e| e.order_index);
        Self {
            id: row.id,
            user_id: row.user_id,
            title: row.title,
            description: row.description,
            duration_minutes: row.duration_minutes,
            calories_burned: row.calories_burned,
            created_at: row.created_at,
            updated_at: row.updated_at,
            entries,
        }
    }
}

impl Owned for WorkoutRow {
    fn owner_id(&self) -> i64 {
        self.user_id
    }
}

/// Validated entry ready for insertion; `order_index` is already resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEntry {
    pub exercise_name: String,
    pub sets: i32,
    pub reps: Option<i32>,
    pub duration_seconds: Option<i32>,
    pub weight: Option<f64>,
    pub notes: String,
    pub order_index: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewWorkout {
    pub title: String,
    pub description: String,
    pub duration_minutes: i32,
    pub calories_burned: i32,
    pub entries: Vec<NewEntry>,
}

/// Partial update. Absent scalars keep their stored value; `entries`, when
/// present, replaces the whole entry set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkoutPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub duration_minutes: Option<i32>,
    pub calories_burned: Option<i32>,
    pub entries: Option<Vec<NewEntry>>,
}

impl WorkoutPatch {
    pub fn apply(&self, row: &mut WorkoutRow) {
        if let Some(title) = &self.title {
            row.title = title.clone();
        }
        if let Some(description) = &self.description {
            row.description = description.clone();
        }
        if let Some(duration) = self.duration_minutes {
            row.duration_minutes = duration;
        }
        if let Some(calories) = self.calories_burned {
            row.calories_burned = calories;
        }
    }
}
