//! Small CLI wrapping the planner end to end: build a catalog, hand-assemble
//! a relational tree for one of a few canned scenarios, lower it with
//! `rel_bin`, and print the resulting statement DAG the way `EXPLAIN` would.
//!
//! Grounded on the teacher's own `bin/` demos that drive `Binder`/`Planner`
//! straight from `main` rather than through the full server loop.

use clap::{Parser, ValueEnum};
use relbin_planner::catalog::{Catalog, ColumnDef, KeyDef, KeyKind, TableDef, TableId};
use relbin_planner::expr::{CmpFlag, Expr};
use relbin_planner::lower::rel_bin;
use relbin_planner::rel::{JoinKind, RelBuilder, RelOp};
use relbin_planner::stmt::pretty::explain_to_string;
use relbin_planner::subtype::Subtype;
use relbin_planner::{PlannerConfig, QueryContext};

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Scenario {
    /// `SELECT a, b FROM orders WHERE id = 1`
    SimpleSelect,
    /// `SELECT o.id, c.name FROM orders o JOIN customers c ON o.customer_id = c.id`
    Join,
}

#[derive(Parser, Debug)]
#[command(name = "relbin-explain", about = "Lower a canned relational plan and print its EXPLAIN tree")]
struct Cli {
    #[arg(value_enum, default_value_t = Scenario::SimpleSelect)]
    scenario: Scenario,
}

fn orders_table() -> TableDef {
    TableDef {
        id: TableId(1),
        schema: "sys".into(),
        name: "orders".into(),
        columns: vec![
            ColumnDef { name: "id".into(), data_type: Subtype::int(), nullable: false },
            ColumnDef { name: "customer_id".into(), data_type: Subtype::int(), nullable: false },
            ColumnDef { name: "amount".into(), data_type: Subtype::decimal(10, 2), nullable: true },
        ],
        keys: vec![KeyDef {
            id: relbin_planner::catalog::KeyId(1),
            name: "orders_pk".into(),
            kind: KeyKind::Primary,
            table: TableId(1),
            columns: vec!["id".into()],
            references: None,
            on_update: relbin_planner::catalog::FkAction::Restrict,
            on_delete: relbin_planner::catalog::FkAction::Restrict,
            hash_index: None,
        }],
        indexes: Vec::new(),
        triggers: Vec::new(),
    }
}

fn customers_table() -> TableDef {
    TableDef {
        id: TableId(2),
        schema: "sys".into(),
        name: "customers".into(),
        columns: vec![
            ColumnDef { name: "id".into(), data_type: Subtype::int(), nullable: false },
            ColumnDef { name: "name".into(), data_type: Subtype::simple(relbin_planner::subtype::BaseType::Varchar), nullable: true },
        ],
        keys: vec![KeyDef {
            id: relbin_planner::catalog::KeyId(2),
            name: "customers_pk".into(),
            kind: KeyKind::Primary,
            table: TableId(2),
            columns: vec!["id".into()],
            references: None,
            on_update: relbin_planner::catalog::FkAction::Restrict,
            on_delete: relbin_planner::catalog::FkAction::Restrict,
            hash_index: None,
        }],
        indexes: Vec::new(),
        triggers: Vec::new(),
    }
}

fn build_simple_select(ctx: &QueryContext, catalog: &Catalog) -> relbin_planner::rel::Rel {
    let orders = catalog.table(TableId(1)).expect("orders registered");
    let base = RelBuilder::new(ctx.new_rel_id(), RelOp::BaseTable).table(orders.clone()).build();
    let pred = Expr::cmp(
        Expr::column("orders", "id", Subtype::int()),
        Expr::literal(relbin_planner::atom::Atom::int(1)),
        CmpFlag::Equal,
    );
    let select = RelBuilder::new(ctx.new_rel_id(), RelOp::Select).left(base).exps(vec![pred]).build();
    RelBuilder::new(ctx.new_rel_id(), RelOp::Project)
        .left(select)
        .exps(vec![
            Expr::column("orders", "id", Subtype::int()),
            Expr::column("orders", "amount", Subtype::decimal(10, 2)),
        ])
        .build()
}

fn build_join(ctx: &QueryContext, catalog: &Catalog) -> relbin_planner::rel::Rel {
    let orders = catalog.table(TableId(1)).expect("orders registered");
    let customers = catalog.table(TableId(2)).expect("customers registered");
    let left = RelBuilder::new(ctx.new_rel_id(), RelOp::BaseTable).table(orders).build();
    let right = RelBuilder::new(ctx.new_rel_id(), RelOp::BaseTable).table(customers).build();
    let equi = Expr::cmp(
        Expr::column("orders", "customer_id", Subtype::int()),
        Expr::column("customers", "id", Subtype::int()),
        CmpFlag::Equal,
    );
    let join = RelBuilder::new(ctx.new_rel_id(), RelOp::Join(JoinKind::Inner))
        .left(left)
        .right(right)
        .exps(vec![equi])
        .build();
    RelBuilder::new(ctx.new_rel_id(), RelOp::Project)
        .left(join)
        .exps(vec![
            Expr::column("orders", "id", Subtype::int()),
            Expr::column("customers", "name", Subtype::simple(relbin_planner::subtype::BaseType::Varchar)),
        ])
        .build()
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let mut catalog = Catalog::new();
    catalog.add_table(orders_table());
    catalog.add_table(customers_table());

    let ctx = QueryContext::new(catalog.clone(), PlannerConfig::default());
    let rel = match cli.scenario {
        Scenario::SimpleSelect => build_simple_select(&ctx, &catalog),
        Scenario::Join => build_join(&ctx, &catalog),
    };

    let stmt = rel_bin(&ctx, &rel)?;
    println!("{}", explain_to_string(&stmt));
    for warning in ctx.warnings() {
        eprintln!("warning: {warning}");
    }
    Ok(())
}
