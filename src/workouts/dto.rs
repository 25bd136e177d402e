use serde::Deserialize;

use crate::error::AppError;
use crate::workouts::repo_types::{NewEntry, NewWorkout, WorkoutPatch};

#[derive(Debug, Deserialize)]
pub struct EntryRequest {
    pub exercise_name: String,
    pub sets: i32,
    pub reps: Option<i32>,
    pub duration_seconds: Option<i32>,
    pub weight: Option<f64>,
    #[serde(default)]
    pub notes: String,
    /// Defaults to the entry's position in the submitted list.
    pub order_index: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct CreateWorkoutRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub duration_minutes: i32,
    #[serde(default)]
    pub calories_burned: i32,
    #[serde(default)]
    pub entries: Vec<EntryRequest>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateWorkoutRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub duration_minutes: Option<i32>,
    pub calories_burned: Option<i32>,
    pub entries: Option<Vec<EntryRequest>>,
}

fn validate_title(title: &str) -> Result<String, AppError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(AppError::validation("title is required"));
    }
    if title.chars().count() > 255 {
        return Err(AppError::validation("title is too long"));
    }
    Ok(title.to_string())
}

fn non_negative(field: &str, value: i32) -> Result<i32, AppError> {
    if value < 0 {
        return Err(AppError::validation(format!("{field} must not be negative")));
    }
    Ok(value)
}

impl EntryRequest {
    fn into_new(self, position: usize) -> Result<NewEntry, AppError> {
        let exercise_name = self.exercise_name.trim().to_string();
        if exercise_name.is_empty() {
            return Err(AppError::validation(format!(
                "entry {position}: exercise_name is required"
            )));
        }
        if self.sets <= 0 {
            return Err(AppError::validation(format!("entry {position}: sets must be positive")));
        }
        match (self.reps, self.duration_seconds) {
            (Some(r), None) if r >= 0 => {}
            (None, Some(d)) if d >= 0 => {}
            (Some(_), Some(_)) | (None, None) => {
                return Err(AppError::validation(format!(
                    "entry {position}: exactly one of reps or duration_seconds is required"
                )))
            }
            _ => {
                return Err(AppError::validation(format!(
                    "entry {position}: reps and duration_seconds must not be negative"
                )))
            }
        }
        if self.weight.is_some_and(|w| !w.is_finite() || w < 0.0) {
            return Err(AppError::validation(format!("entry {position}: invalid weight")));
        }
        let order_index = match self.order_index {
            Some(i) => i,
            None => i32::try_from(position)
                .map_err(|_| AppError::validation("too many entries"))?,
        };
        Ok(NewEntry {
            exercise_name,
            sets: self.sets,
            reps: self.reps,
            duration_seconds: self.duration_seconds,
            weight: self.weight,
            notes: self.notes,
            order_index,
        })
    }
}

fn into_entries(entries: Vec<EntryRequest>) -> Result<Vec<NewEntry>, AppError> {
    entries
        .into_iter()
        .enumerate()
        .map(|(position, e)| e.into_new(position))
        .collect()
}

impl CreateWorkoutRequest {
    pub fn validate(self) -> Result<NewWorkout, AppError> {
        Ok(NewWorkout {
            title: validate_title(&self.title)?,
            description: self.description,
            duration_minutes: non_negative("duration_minutes", self.duration_minutes)?,
            calories_burned: non_negative("calories_burned", self.calories_burned)?,
            entries: into_entries(self.entries)?,
        })
    }
}

impl UpdateWorkoutRequest {
    pub fn validate(self) -> Result<WorkoutPatch, AppError> {
        Ok(WorkoutPatch {
            title: self.title.as_deref().map(validate_title).transpose()?,
            description: self.description,
            duration_minutes: self
                .duration_minutes
                .map(|v| non_negative("duration_minutes", v))
                .transpose()?,
            calories_burned: self
                .calories_burned
                .map(|v| non_negative("calories_burned", v))
                .transpose()?,
            entries: self.entries.map(into_entries).transpose()?,
        })
    }
}
