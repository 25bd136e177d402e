//! Workout aggregate persistence.
//!
//! Every write runs in one transaction: the parent row and all of its
//! entries commit together or not at all. Update and delete lock the parent
//! row and check ownership inside that same transaction.

use sqlx::{PgConnection, PgPool};
use tracing::{debug, info};

use crate::auth::{extractors::Identity, gate::authorize};
use crate::error::{store_err, AppError, AppResult};
use crate::workouts::repo_types::{NewEntry, NewWorkout, Workout, WorkoutEntry, WorkoutPatch, WorkoutRow};

const WORKOUT_COLUMNS: &str =
    "id, user_id, title, description, duration_minutes, calories_burned, created_at, updated_at";

async fn insert_entries(
    conn: &mut PgConnection,
    workout_id: i64,
    entries: &[NewEntry],
) -> AppResult<Vec<WorkoutEntry>> {
    let mut out = Vec::with_capacity(entries.len());
    for e in entries {
        let row = sqlx::query_as::<_, WorkoutEntry>(
            r#"
            INSERT INTO workout_entries
                (workout_id, exercise_name, sets, reps, duration_seconds, weight, notes, order_index)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, exercise_name, sets, reps, duration_seconds, weight, notes, order_index
            "#,
        )
        .bind(workout_id)
        .bind(&e.exercise_name)
        .bind(e.sets)
        .bind(e.reps)
        .bind(e.duration_seconds)
        .bind(e.weight)
        .bind(&e.notes)
        .bind(e.order_index)
        .fetch_one(&mut *conn)
        .await
        .map_err(store_err("insert workout entry"))?;
        out.push(row);
    }
    Ok(out)
}

async fn load_entries(conn: &mut PgConnection, workout_id: i64) -> AppResult<Vec<WorkoutEntry>> {
    sqlx::query_as::<_, WorkoutEntry>(
        r#"
        SELECT id, exercise_name, sets, reps, duration_seconds, weight, notes, order_index
        FROM workout_entries
        WHERE workout_id = $1
        ORDER BY order_index ASC
        "#,
    )
    .bind(workout_id)
    .fetch_all(&mut *conn)
    .await
    .map_err(store_err("load workout entries"))
}

/// Lock the parent row for the rest of the transaction.
async fn lock_workout(conn: &mut PgConnection, id: i64) -> AppResult<WorkoutRow> {
    sqlx::query_as::<_, WorkoutRow>(&format!(
        "SELECT {WORKOUT_COLUMNS} FROM workouts WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(store_err("lock workout"))?
    .ok_or_else(|| AppError::not_found("workout"))
}

pub async fn create(db: &PgPool, owner_id: i64, new: &NewWorkout) -> AppResult<Workout> {
    let mut tx = db.begin().await.map_err(store_err("begin tx"))?;

    let row = sqlx::query_as::<_, WorkoutRow>(&format!(
        r#"
        INSERT INTO workouts (user_id, title, description, duration_minutes, calories_burned)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {WORKOUT_COLUMNS}
        "#
    ))
    .bind(owner_id)
    .bind(&new.title)
    .bind(&new.description)
    .bind(new.duration_minutes)
    .bind(new.calories_burned)
    .fetch_one(&mut *tx)
    .await
    .map_err(store_err("insert workout"))?;

    // an error here drops `tx`, which rolls the parent back too
    let entries = insert_entries(&mut tx, row.id, &new.entries).await?;

    tx.commit().await.map_err(store_err("commit tx"))?;
    info!(workout_id = row.id, owner_id, entries = entries.len(), "workout created");
    Ok(Workout::from_parts(row, entries))
}

pub async fn get_by_id(db: &PgPool, id: i64) -> AppResult<Workout> {
    let mut tx = db.begin().await.map_err(store_err("begin tx"))?;
    // parent and entries from one snapshot
    sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
        .execute(&mut *tx)
        .await
        .map_err(store_err("set isolation"))?;

    let row = sqlx::query_as::<_, WorkoutRow>(&format!(
        "SELECT {WORKOUT_COLUMNS} FROM workouts WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(&mut *tx)
    .await
    .map_err(store_err("load workout"))?
    .ok_or_else(|| AppError::not_found("workout"))?;
    let entries = load_entries(&mut tx, id).await?;

    tx.commit().await.map_err(store_err("commit tx"))?;
    Ok(Workout::from_parts(row, entries))
}

/// Apply `patch` as `identity`. When `patch.entries` is set, every stored
/// entry is deleted and the submitted set inserted in its place.
pub async fn update(
    db: &PgPool,
    identity: &Identity,
    id: i64,
    patch: &WorkoutPatch,
) -> AppResult<Workout> {
    let mut tx = db.begin().await.map_err(store_err("begin tx"))?;

    let mut row = lock_workout(&mut tx, id).await?;
    authorize(identity, &row)?;
    patch.apply(&mut row);

    let row = sqlx::query_as::<_, WorkoutRow>(&format!(
        r#"
        UPDATE workouts
        SET title = $1, description = $2, duration_minutes = $3, calories_burned = $4,
            updated_at = now()
        WHERE id = $5
        RETURNING {WORKOUT_COLUMNS}
        "#
    ))
    .bind(&row.title)
    .bind(&row.description)
    .bind(row.duration_minutes)
    .bind(row.calories_burned)
    .bind(id)
    .fetch_optional(&mut *tx)
    .await
    .map_err(store_err("update workout"))?
    .ok_or_else(|| AppError::not_found("workout"))?;

    let entries = match &patch.entries {
        Some(new_entries) => {
            let removed = sqlx::query("DELETE FROM workout_entries WHERE workout_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(store_err("delete workout entries"))?
                .rows_affected();
            debug!(workout_id = id, removed, inserted = new_entries.len(), "replacing entries");
            insert_entries(&mut tx, id, new_entries).await?
        }
        None => load_entries(&mut tx, id).await?,
    };

    tx.commit().await.map_err(store_err("commit tx"))?;
    info!(workout_id = id, "workout updated");
    Ok(Workout::from_parts(row, entries))
}

/// Delete as `identity`; entries go with the parent through the cascade.
pub async fn delete(db: &PgPool, identity: &Identity, id: i64) -> AppResult<()> {
    let mut tx = db.begin().await.map_err(store_err("begin tx"))?;

    let row = lock_workout(&mut tx, id).await?;
    authorize(identity, &row)?;

    let affected = sqlx::query("DELETE FROM workouts WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(store_err("delete workout"))?
        .rows_affected();
    if affected != 1 {
        return Err(AppError::not_found("workout"));
    }

    tx.commit().await.map_err(store_err("commit tx"))?;
    info!(workout_id = id, "workout deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{create_user, test_pool, unique};

    fn entry(name: &str, order_index: i32) -> NewEntry {
        NewEntry {
            exercise_name: name.into(),
            sets: 3,
            reps: Some(10),
            duration_seconds: None,
            weight: Some(60.0),
            notes: String::new(),
            order_index,
        }
    }

    fn workout(title: &str, entries: Vec<NewEntry>) -> NewWorkout {
        NewWorkout {
            title: title.into(),
            description: "push for day 1".into(),
            duration_minutes: 60,
            calories_burned: 200,
            entries,
        }
    }

    fn names(w: &Workout) -> Vec<&str> {
        w.entries.iter().map(|e| e.exercise_name.as_str()).collect()
    }

    async fn count(db: &PgPool, sql: &str, id: i64) -> i64 {
        sqlx::query_scalar(sql).bind(id).fetch_one(db).await.unwrap()
    }

    #[tokio::test]
    async fn create_then_read_back() {
        let Some(db) = test_pool().await else { return };
        let user = create_user(&db, "reader").await;
        let created = create(
            &db,
            user.id,
            &workout("Push day", vec![entry("Bench", 0), entry("Dips", 1)]),
        )
        .await
        .unwrap();
        assert!(created.id > 0);
        assert_eq!(created.user_id, user.id);
        assert!(created.entries.iter().all(|e| e.id > 0));

        let fetched = get_by_id(&db, created.id).await.unwrap();
        assert_eq!(fetched.title, "Push day");
        assert_eq!(fetched.entries, created.entries);
        assert_eq!(names(&fetched), vec!["Bench", "Dips"]);
    }

    #[tokio::test]
    async fn read_orders_by_index_not_insertion() {
        let Some(db) = test_pool().await else { return };
        let user = create_user(&db, "order").await;
        let created = create(
            &db,
            user.id,
            &workout("Pull day", vec![entry("Rows", 2), entry("Pullups", 0), entry("Curls", 1)]),
        )
        .await
        .unwrap();
        let fetched = get_by_id(&db, created.id).await.unwrap();
        assert_eq!(names(&fetched), vec!["Pullups", "Curls", "Rows"]);
    }

    #[tokio::test]
    async fn missing_workout_is_not_found() {
        let Some(db) = test_pool().await else { return };
        let err = get_by_id(&db, i64::MAX).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound { entity: "workout" }));
    }

    #[tokio::test]
    async fn failed_entry_rolls_back_whole_aggregate() {
        let Some(db) = test_pool().await else { return };
        let user = create_user(&db, "atomic").await;
        let marker = unique("squat");
        // third entry reuses order index 1 and violates the unique constraint
        let err = create(
            &db,
            user.id,
            &workout(
                "Leg day",
                vec![entry(&marker, 0), entry(&marker, 1), entry(&marker, 1)],
            ),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let parents = count(&db, "SELECT COUNT(*) FROM workouts WHERE user_id = $1", user.id).await;
        assert_eq!(parents, 0);
        let children: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM workout_entries WHERE exercise_name = $1",
        )
        .bind(&marker)
        .fetch_one(&db)
        .await
        .unwrap();
        assert_eq!(children, 0);
    }

    #[tokio::test]
    async fn update_replaces_entry_set() {
        let Some(db) = test_pool().await else { return };
        let user = create_user(&db, "replace").await;
        let identity = Identity::Authenticated(user.clone());
        let created = create(
            &db,
            user.id,
            &workout("Full body", vec![entry("A", 0), entry("B", 1), entry("C", 2)]),
        )
        .await
        .unwrap();

        let updated = update(
            &db,
            &identity,
            created.id,
            &WorkoutPatch {
                entries: Some(vec![entry("B", 0), entry("D", 1)]),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(names(&updated), vec!["B", "D"]);
        assert_eq!(updated.title, "Full body");

        let fetched = get_by_id(&db, created.id).await.unwrap();
        assert_eq!(names(&fetched), vec!["B", "D"]);
        let indices: Vec<i32> = fetched.entries.iter().map(|e| e.order_index).collect();
        assert_eq!(indices, vec![0, 1]);
        let rows = count(
            &db,
            "SELECT COUNT(*) FROM workout_entries WHERE workout_id = $1",
            created.id,
        )
        .await;
        assert_eq!(rows, 2);
    }

    #[tokio::test]
    async fn update_without_entries_keeps_them() {
        let Some(db) = test_pool().await else { return };
        let user = create_user(&db, "scalars").await;
        let identity = Identity::Authenticated(user.clone());
        let created = create(&db, user.id, &workout("Easy", vec![entry("Walk", 0)]))
            .await
            .unwrap();
        let updated = update(
            &db,
            &identity,
            created.id,
            &WorkoutPatch {
                title: Some("Hard".into()),
                duration_minutes: Some(90),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.title, "Hard");
        assert_eq!(updated.duration_minutes, 90);
        assert_eq!(updated.calories_burned, 200);
        assert_eq!(updated.entries, created.entries);
    }

    #[tokio::test]
    async fn failed_replace_leaves_previous_state() {
        let Some(db) = test_pool().await else { return };
        let user = create_user(&db, "keep").await;
        let identity = Identity::Authenticated(user.clone());
        let created = create(&db, user.id, &workout("Before", vec![entry("A", 0)]))
            .await
            .unwrap();
        let err = update(
            &db,
            &identity,
            created.id,
            &WorkoutPatch {
                title: Some("After".into()),
                entries: Some(vec![entry("X", 0), entry("Y", 0)]),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let fetched = get_by_id(&db, created.id).await.unwrap();
        assert_eq!(fetched.title, "Before");
        assert_eq!(names(&fetched), vec!["A"]);
    }

    #[tokio::test]
    async fn update_of_missing_workout_is_not_found() {
        let Some(db) = test_pool().await else { return };
        let user = create_user(&db, "ghostwriter").await;
        let patch = WorkoutPatch {
            title: Some("Nowhere".into()),
            entries: Some(vec![entry("A", 0)]),
            ..Default::default()
        };
        let err = update(&db, &Identity::Authenticated(user), i64::MAX, &patch)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound { entity: "workout" }));
    }

    #[tokio::test]
    async fn non_owner_is_forbidden_owner_succeeds() {
        let Some(db) = test_pool().await else { return };
        let owner = create_user(&db, "owner").await;
        let intruder = create_user(&db, "intruder").await;
        let created = create(&db, owner.id, &workout("Mine", vec![entry("A", 0)]))
            .await
            .unwrap();
        let patch = WorkoutPatch {
            title: Some("Stolen".into()),
            ..Default::default()
        };

        let err = update(&db, &Identity::Authenticated(intruder.clone()), created.id, &patch)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden));
        let err = delete(&db, &Identity::Authenticated(intruder), created.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden));
        let err = delete(&db, &Identity::Anonymous, created.id).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden));
        assert_eq!(get_by_id(&db, created.id).await.unwrap().title, "Mine");

        let owner_identity = Identity::Authenticated(owner);
        let updated = update(&db, &owner_identity, created.id, &patch).await.unwrap();
        assert_eq!(updated.title, "Stolen");
        delete(&db, &owner_identity, created.id).await.unwrap();
    }

    #[tokio::test]
    async fn delete_cascades_to_entries() {
        let Some(db) = test_pool().await else { return };
        let user = create_user(&db, "cascade").await;
        let identity = Identity::Authenticated(user.clone());
        let created = create(&db, user.id, &workout("Gone", vec![entry("A", 0), entry("B", 1)]))
            .await
            .unwrap();

        delete(&db, &identity, created.id).await.unwrap();

        assert!(matches!(
            get_by_id(&db, created.id).await,
            Err(AppError::NotFound { .. })
        ));
        let children = count(
            &db,
            "SELECT COUNT(*) FROM workout_entries WHERE workout_id = $1",
            created.id,
        )
        .await;
        assert_eq!(children, 0);
        assert!(matches!(
            delete(&db, &identity, created.id).await,
            Err(AppError::NotFound { .. })
        ));
    }
}
