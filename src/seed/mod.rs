use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::error::AppResult;

static FIRST_NAMES: &[&str] = &[
    "Aarav", "Priya", "Rohan", "Ananya", "Kabir", "Ishita", "Vikram", "Meera",
    "Arjun", "Sana", "Dev", "Nisha", "Ravi", "Tara", "Karan", "Pooja",
];

static LAST_NAMES: &[&str] = &[
    "Sharma", "Patel", "Singh", "Gupta", "Reddy", "Nair", "Mehta", "Iyer",
    "Bose", "Kapoor", "Joshi", "Desai",
];

static STORE_PREFIXES: &[&str] = &[
    "Green", "Eco", "Fresh", "Urban", "Village", "Sunrise", "Riverside", "Metro",
];

static STORE_SUFFIXES: &[&str] = &["Mart", "Depot", "Market", "Corner", "Bazaar", "Store"];

static PACKAGE_KINDS: &[&str] = &["Box", "Bottle", "Bag", "Wrapper", "Crate", "Can", "Jar"];

static MATERIALS: &[&str] = &["Plastic", "Cardboard", "Glass", "Metal", "Paper"];

static SIZES: &[&str] = &["small", "medium", "large"];

#[derive(Debug, Serialize)]
pub struct SeedSummary {
    pub users: usize,
    pub retailers: usize,
    pub packages: usize,
}

fn random_name(rng: &mut impl Rng) -> String {
    let first = FIRST_NAMES.choose(rng).unwrap_or(&"Demo");
    let last = LAST_NAMES.choose(rng).unwrap_or(&"User");
    format!("{} {}", first, last)
}

/// Populate demo users, retailers and package descriptors so the return
/// flows can be exercised right after startup. Emails and barcodes are
/// deterministic, so reseeding is idempotent.
pub async fn seed_demo(
    pool: &PgPool,
    user_count: usize,
    retailer_count: usize,
    package_count: usize,
) -> AppResult<SeedSummary> {
    info!(user_count, retailer_count, package_count, "Seeding demo data...");

    // StdRng is Send + Sync — safe to hold across async await points
    let mut rng = StdRng::from_entropy();

    // ── Users (batch insert via unnest) ──────────────────────────────────────
    let names: Vec<String> = (0..user_count).map(|_| random_name(&mut rng)).collect();
    let emails: Vec<String> = (0..user_count)
        .map(|i| format!("demo.user.{}@reloop.dev", i))
        .collect();

    let inserted_users = sqlx::query(
        r#"
        INSERT INTO users (name, email, role)
        SELECT name, email, 'user' FROM UNNEST($1::text[], $2::text[]) AS t(name, email)
        ON CONFLICT (email) DO NOTHING
        "#,
    )
    .bind(&names)
    .bind(&emails)
    .execute(pool)
    .await?
    .rows_affected() as usize;

    // ── Retailers (login user + store record, one pair at a time) ────────────
    let mut inserted_retailers = 0usize;
    for i in 0..retailer_count {
        let name = random_name(&mut rng);
        let email = format!("demo.retailer.{}@reloop.dev", i);
        let store_name = format!(
            "{} {} #{:02}",
            STORE_PREFIXES.choose(&mut rng).unwrap_or(&"Green"),
            STORE_SUFFIXES.choose(&mut rng).unwrap_or(&"Mart"),
            i
        );
        let phone = format!("+91-98{:08}", rng.gen_range(0..100_000_000u64));

        let user_id: (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO users (name, email, role)
            VALUES ($1, $2, 'retailer')
            ON CONFLICT (email) DO UPDATE SET role = 'retailer'
            RETURNING id
            "#,
        )
        .bind(&name)
        .bind(&email)
        .fetch_one(pool)
        .await?;

        let result = sqlx::query(
            r#"
            INSERT INTO retailers (user_id, store_name, phone)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(user_id.0)
        .bind(&store_name)
        .bind(&phone)
        .execute(pool)
        .await?;

        inserted_retailers += result.rows_affected() as usize;
    }

    // ── Package descriptors ──────────────────────────────────────────────────
    let mut kinds: Vec<String> = Vec::with_capacity(package_count);
    let mut materials: Vec<String> = Vec::with_capacity(package_count);
    let mut sizes: Vec<String> = Vec::with_capacity(package_count);
    let mut barcodes: Vec<String> = Vec::with_capacity(package_count);

    for i in 0..package_count {
        kinds.push(PACKAGE_KINDS.choose(&mut rng).unwrap_or(&"Box").to_string());
        materials.push(MATERIALS.choose(&mut rng).unwrap_or(&"Plastic").to_string());
        sizes.push(SIZES.choose(&mut rng).unwrap_or(&"medium").to_string());
        barcodes.push(format!("RL-{:06}", i));
    }

    let inserted_packages = sqlx::query(
        r#"
        INSERT INTO packages (kind, material, size, barcode, recyclable, biodegradable)
        SELECT kind, material, size, barcode, TRUE, FALSE
        FROM UNNEST($1::text[], $2::text[], $3::text[], $4::text[]) AS t(kind, material, size, barcode)
        ON CONFLICT (barcode) DO NOTHING
        "#,
    )
    .bind(&kinds)
    .bind(&materials)
    .bind(&sizes)
    .bind(&barcodes)
    .execute(pool)
    .await?
    .rows_affected() as usize;

    info!(
        users = inserted_users,
        retailers = inserted_retailers,
        packages = inserted_packages,
        "Seeding complete"
    );

    Ok(SeedSummary {
        users: inserted_users,
        retailers: inserted_retailers,
        packages: inserted_packages,
    })
}
