//! `personnel` command-line entry point.
//!
//! Wires the PostgreSQL adapters into the domain services and prints the
//! result of one operation as JSON.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::io::{self, Write};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};
use serde::Serialize;
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt};

use personnel::config::PersonnelSettings;
use personnel::domain::attributes::{Cardinality, DesiredAttributes};
use personnel::domain::{EmployeeId, EmployeeService, RoleId, RoleService};
use personnel::outbound::persistence::{
    DbPool, DieselAttributeSetQuery, DieselAttributeUnitOfWork, DieselEmployeeRepository,
    DieselPermissionRuleRepository, DieselRoleRepository, PoolConfig,
};

/// `personnel` command arguments.
#[derive(Debug, Parser)]
#[command(name = "personnel", about = "Inspect and maintain personnel records", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the grouped permission manifest of a role.
    Manifest {
        /// Role id.
        #[arg(long)]
        role: i32,
    },
    /// Print the attribute set of an employee.
    Attributes {
        /// Employee id.
        #[arg(long)]
        employee: i32,
    },
    /// Replace the attribute set of an employee.
    Reconcile {
        /// Employee id.
        #[arg(long)]
        employee: i32,
        /// JSON object mapping attribute names to lists of values.
        #[arg(long, value_name = "json")]
        attributes: String,
    },
    /// Change the cardinality of one attribute.
    Cardinality {
        /// Employee id.
        #[arg(long)]
        employee: i32,
        /// Attribute name.
        #[arg(long)]
        name: String,
        /// Store more than one value (`true`) or at most one (`false`).
        #[arg(long)]
        multiple: bool,
    },
    /// Print several employees with their attributes, newest id first.
    Fetch {
        /// Comma-separated employee ids.
        #[arg(long, value_delimiter = ',', num_args = 1..)]
        ids: Vec<i32>,
    },
    /// Print one page of employees.
    List {
        /// Page size.
        #[arg(long, default_value_t = 20)]
        limit: u32,
        /// Rows to skip.
        #[arg(long, default_value_t = 0)]
        offset: u32,
    },
}

type Employees =
    EmployeeService<DieselEmployeeRepository, DieselAttributeUnitOfWork, DieselAttributeSetQuery>;
type Roles = RoleService<DieselRoleRepository, DieselPermissionRuleRepository>;

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).wrap_err("serialise output")?;
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{rendered}").wrap_err("write output")?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let cli = Cli::parse();
    let settings = PersonnelSettings::load_from_environment()?;
    let database_url = settings.require_database_url()?;
    let pool = DbPool::new(PoolConfig::from_settings(database_url, &settings))
        .await
        .wrap_err("create database pool")?;

    let employees: Employees = EmployeeService::new(
        Arc::new(DieselEmployeeRepository::new(pool.clone())),
        Arc::new(DieselAttributeUnitOfWork::new(pool.clone())),
        Arc::new(DieselAttributeSetQuery::new(pool.clone())),
        settings.uniqueness_validator()?,
    );
    let roles: Roles = RoleService::new(
        Arc::new(DieselRoleRepository::new(pool.clone())),
        Arc::new(DieselPermissionRuleRepository::new(pool)),
    );

    run(cli.command, &employees, &roles).await
}

async fn run(command: Command, employees: &Employees, roles: &Roles) -> Result<()> {
    match command {
        Command::Manifest { role } => {
            let manifest = roles.manifest(RoleId::new(role)).await?;
            print_json(&manifest)
        }
        Command::Attributes { employee } => {
            let attributes = employees.attributes(EmployeeId::new(employee)).await?;
            print_json(&attributes)
        }
        Command::Reconcile {
            employee,
            attributes,
        } => {
            let desired: DesiredAttributes =
                serde_json::from_str(&attributes).wrap_err("parse --attributes")?;
            let owner = EmployeeId::new(employee);
            let stored = employees.reconcile_attributes(owner, desired).await?;
            print_json(&stored)
        }
        Command::Cardinality {
            employee,
            name,
            multiple,
        } => {
            let owner = EmployeeId::new(employee);
            employees
                .set_attribute_cardinality(owner, &name, Cardinality::from_multiple_flag(multiple))
                .await?;
            let stored = employees.attributes(owner).await?;
            print_json(&stored)
        }
        Command::Fetch { ids } => {
            let ids: Vec<EmployeeId> = ids.into_iter().map(EmployeeId::new).collect();
            let found = employees.fetch_many(&ids).await?;
            print_json(&found)
        }
        Command::List { limit, offset } => {
            let page = employees.list_page(limit, offset).await?;
            print_json(&page)
        }
    }
}
