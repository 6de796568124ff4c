//! Built-in datasets used when no data file is given.

use crate::dataset::Dataset;
use crate::domain::TVError;
use crate::schema::{ColumnDef, Record, Schema, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Demo {
    Freelancers,
    Employees,
}

impl Demo {
    pub fn load(&self) -> Result<Dataset, TVError> {
        match self {
            Demo::Freelancers => freelancers(),
            Demo::Employees => employees(),
        }
    }
}

/// Freelancer directory. The professional description is only shown in the
/// expanded row but is part of the export.
pub fn freelancers() -> Result<Dataset, TVError> {
    let schema = Schema::new(vec![
        ColumnDef::text("full_name", "Full Name"),
        ColumnDef::text("pdesc", "Professional Description").detail(),
        ColumnDef::text("pskill", "Primary Skill"),
        ColumnDef::text("sskill", "Secondary Skill"),
        ColumnDef::numeric("pexp", "Professional Experience"),
        ColumnDef::numeric("fexp", "Freelancing Experience"),
        ColumnDef::numeric("phcharge", "Per Hour Charge"),
        ColumnDef::text("avail_name", "Availability"),
        ColumnDef::text("del_name", "Delivery Mode"),
    ])?;

    #[rustfmt::skip]
    let rows: [(&str, &str, &str, &str, &str, i32, i32, i32, &str, &str); 8] = [
        ("maria-lopez", "Maria Lopez", "Backend engineer focused on payment systems", "Rust", "PostgreSQL", 9, 4, 95, "Full Time", "Remote"),
        ("tom-becker", "Tom Becker", "Frontend developer, design systems and accessibility", "TypeScript", "React", 6, 2, 70, "Part Time", "Hybrid"),
        ("anika-rao", "Anika Rao", "Data engineer building streaming pipelines", "Python", "Kafka", 7, 5, 85, "Full Time", "Remote"),
        ("li-wei", "Li Wei", "Mobile developer shipping cross platform apps", "Kotlin", "Swift", 5, 3, 65, "Hourly", "On Site"),
        ("omar-haddad", "Omar Haddad", "DevOps consultant, \"infrastructure as code\" advocate", "Terraform", "Go", 11, 6, 110, "Part Time", "Remote"),
        ("sofia-rossi", "Sofia Rossi", "UX researcher and product designer", "Figma", "Research", 8, 8, 75, "Full Time", "Hybrid"),
        ("jonas-berg", "Jonas Berg", "Embedded engineer for industrial controllers", "C", "Rust", 12, 1, 95, "Hourly", "On Site"),
        ("amy-chen", "Amy Chen", "Machine learning engineer, recommender systems", "Python", "PyTorch", 4, 2, 90, "Full Time", "Remote"),
    ];

    let records = rows
        .iter()
        .map(|&(id, name, desc, pskill, sskill, pexp, fexp, charge, avail, del)| {
            Record::new(
                id,
                vec![
                    Value::from(name),
                    Value::from(desc),
                    Value::from(pskill),
                    Value::from(sskill),
                    Value::from(pexp),
                    Value::from(fexp),
                    Value::from(charge),
                    Value::from(avail),
                    Value::from(del),
                ],
            )
        })
        .collect();

    Dataset::new("freelancers", schema, records)
}

/// Employee list with a salary column and a catch phrase in the detail row.
pub fn employees() -> Result<Dataset, TVError> {
    let schema = Schema::new(vec![
        ColumnDef::text("name", "Name"),
        ColumnDef::text("email", "Email"),
        ColumnDef::numeric("salary", "Salary").banded(50000.0, 75000.0),
        ColumnDef::text("catch_phrase", "Signature Catch Phrase").detail(),
    ])?;

    #[rustfmt::skip]
    let rows: [(u64, &str, &str, i32, &str); 6] = [
        (1, "Bob Miller", "bob.miller@example.com", 40000, "Synergized static matrix"),
        (2, "Amy Jones", "amy.jones@example.com", 90000, "Cloned bottom-line approach"),
        (3, "Carl Nguyen", "carl.nguyen@example.com", 62000, "Robust fresh-thinking protocol"),
        (4, "Dana White", "dana.white@example.com", 51000, "Persistent hybrid paradigm"),
        (5, "Eve Adams", "eve.adams@example.com", 78000, "Optimized zero tolerance hub"),
        (6, "Frank Ortiz", "frank.ortiz@example.com", 40000, "Ergonomic user-facing interface"),
    ];

    let records = rows
        .iter()
        .map(|&(id, name, email, salary, phrase)| {
            Record::new(
                id,
                vec![
                    Value::from(name),
                    Value::from(email),
                    Value::from(salary),
                    Value::from(phrase),
                ],
            )
        })
        .collect();

    Dataset::new("employees", schema, records)
}
