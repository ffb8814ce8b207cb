//! Integration tests for the six concrete scenarios in the testable-
//! properties section: each builds the relational tree a bound query of
//! that shape would produce, lowers it, and checks the resulting statement
//! DAG against the shape the scenario calls for.

use relbin_planner::atom::Atom;
use relbin_planner::catalog::{
    Catalog, ColumnDef, FkAction, KeyDef, KeyId, KeyKind, TableDef, TableId, TriggerEvent,
};
use relbin_planner::config::PlannerConfig;
use relbin_planner::expr::{CmpFlag, Expr};
use relbin_planner::lower::rel_bin;
use relbin_planner::psm::{compile_function, compile_trigger, ParamMode, ProcParam, ProcStmt};
use relbin_planner::query_context::QueryContext;
use relbin_planner::rel::{DmlKind, RelBuilder, RelOp, UpdFlags};
use relbin_planner::stmt::Stmt;
use relbin_planner::subtype::Subtype;

fn int_col(name: &str, nullable: bool) -> ColumnDef {
    ColumnDef { name: name.into(), data_type: Subtype::int(), nullable }
}

/// Depth-first search for any statement matching `pred`.
fn find_stmt(stmt: &Stmt, pred: &dyn Fn(&Stmt) -> bool) -> bool {
    if pred(stmt) {
        return true;
    }
    stmt.children().iter().any(|c| find_stmt(c, pred))
}

fn count_stmt(stmt: &Stmt, pred: &dyn Fn(&Stmt) -> bool) -> usize {
    let here = if pred(stmt) { 1 } else { 0 };
    here + stmt.children().iter().map(|c| count_stmt(c, pred)).sum::<usize>()
}

// S1: CREATE TABLE t(a INT PRIMARY KEY, b INT NOT NULL); INSERT INTO t VALUES (1,10),(1,20);
#[test]
fn s1_insert_carries_one_pk_guard_and_one_not_null_guard() {
    let mut catalog = Catalog::new();
    let t = catalog.add_table(TableDef {
        id: TableId(1),
        schema: "sys".into(),
        name: "t".into(),
        columns: vec![int_col("a", false), int_col("b", false)],
        keys: vec![KeyDef {
            id: KeyId(1),
            name: "t_pk".into(),
            kind: KeyKind::Primary,
            table: TableId(1),
            columns: vec!["a".into()],
            references: None,
            on_update: FkAction::Restrict,
            on_delete: FkAction::Restrict,
            hash_index: None,
        }],
        indexes: Vec::new(),
        triggers: Vec::new(),
    });

    let ctx = QueryContext::new(catalog, PlannerConfig::default());
    // The VALUES-row source itself is out of scope (no surface parser); a
    // base-table read stands in as a placeholder row source, since the
    // guards under test don't depend on where the inserted rows come from.
    let rows = RelBuilder::new(ctx.new_rel_id(), RelOp::BaseTable).table(t.clone()).build();
    let insert = RelBuilder::new(ctx.new_rel_id(), RelOp::Dml(DmlKind::Insert))
        .left(rows)
        .table(t)
        .upd_flags(UpdFlags::default())
        .build();

    let stmt = rel_bin(&ctx, &insert).unwrap();
    let exception_count = count_stmt(&stmt, &|s| matches!(s, Stmt::Exception(_)));
    // one not-null guard per column (a is the primary key, so it's
    // NOT NULL too; b is declared NOT NULL directly) + one unique-key guard
    // for the single primary key (its within-batch and against-existing
    // stages OR into a single exception condition).
    assert_eq!(exception_count, 3);
    assert!(find_stmt(&stmt, &|s| matches!(s, Stmt::Append(_))));
}

// S2: SELECT a FROM t WHERE b IN (1,2,3);
#[test]
fn s2_in_predicate_lowers_to_constant_list_semijoin() {
    let mut catalog = Catalog::new();
    let t = catalog.add_table(TableDef {
        id: TableId(1),
        schema: "sys".into(),
        name: "t".into(),
        columns: vec![int_col("a", true), int_col("b", true)],
        keys: Vec::new(),
        indexes: Vec::new(),
        triggers: Vec::new(),
    });
    let ctx = QueryContext::new(catalog, PlannerConfig::default());

    let base = RelBuilder::new(ctx.new_rel_id(), RelOp::BaseTable).table(t).build();
    let pred = Expr::cmp(
        Expr::column("t", "b", Subtype::int()),
        Expr::value_list(vec![Expr::literal(Atom::int(1)), Expr::literal(Atom::int(2)), Expr::literal(Atom::int(3))]),
        CmpFlag::In,
    );
    let select = RelBuilder::new(ctx.new_rel_id(), RelOp::Select).left(base).exps(vec![pred]).build();
    let project = RelBuilder::new(ctx.new_rel_id(), RelOp::Project)
        .left(select)
        .exps(vec![Expr::column("t", "a", Subtype::int())])
        .build();

    let stmt = rel_bin(&ctx, &project).unwrap();
    assert!(matches!(stmt, Stmt::Project(_)));
    // IN lowers through unique/reverse/semi-join rather than a bare
    // USelect -- `reverse(unique(values))` probed via a semi-join.
    assert!(find_stmt(&stmt, &|s| matches!(s, Stmt::Unique(_))));
    assert!(find_stmt(&stmt, &|s| matches!(s, Stmt::Reverse(_))));
    assert!(find_stmt(&stmt, &|s| matches!(s, Stmt::SemiJoin(_))));
    assert!(find_stmt(&stmt, &|s| matches!(s, Stmt::List(_))));
}

// S3: SELECT a, SUM(b) FROM t GROUP BY a HAVING SUM(b) > 10 ORDER BY a DESC LIMIT 5;
#[test]
fn s3_groupby_having_order_limit_fuses_topn_with_order() {
    let mut catalog = Catalog::new();
    let t = catalog.add_table(TableDef {
        id: TableId(1),
        schema: "sys".into(),
        name: "t".into(),
        columns: vec![int_col("a", true), int_col("b", true)],
        keys: Vec::new(),
        indexes: Vec::new(),
        triggers: Vec::new(),
    });
    let ctx = QueryContext::new(catalog, PlannerConfig::default());

    let base = RelBuilder::new(ctx.new_rel_id(), RelOp::BaseTable).table(t).build();
    let group_key = Expr::column("t", "a", Subtype::int());
    let sum_b = Expr::aggr("sum", Some(Expr::column("t", "b", Subtype::int())), Subtype::int(), false, false)
        .alias("sum_b");
    let groupby = RelBuilder::new(ctx.new_rel_id(), RelOp::GroupBy)
        .left(base)
        .group_keys(vec![group_key.clone()])
        .exps(vec![group_key.clone().alias("a"), sum_b])
        .build();

    let having = Expr::cmp(Expr::column("", "sum_b", Subtype::int()), Expr::literal(Atom::int(10)), CmpFlag::Gt);
    let select = RelBuilder::new(ctx.new_rel_id(), RelOp::Select).left(groupby).exps(vec![having]).build();

    let topn = RelBuilder::new(ctx.new_rel_id(), RelOp::TopN)
        .left(select.clone())
        .order_by(vec![relbin_planner::expr::OrderItem { expr: Expr::column("", "a", Subtype::int()), ascending: false }])
        .limit(Expr::literal(Atom::int(5)))
        .build();

    // The group/aggregate computation lives in the select's own output
    // (TOP-N only carries the sort-key/limit-bound statements, the way
    // `st_order`/`st_limit` operate on an oid ordering rather than the full
    // row set), so check it on the select's lowering directly.
    let select_stmt = rel_bin(&ctx, &select).unwrap();
    assert!(find_stmt(&select_stmt, &|s| matches!(s, Stmt::Aggr(p) if p.func == "sum")));
    assert!(find_stmt(&select_stmt, &|s| matches!(s, Stmt::GenGroup(_))));

    let stmt = rel_bin(&ctx, &topn).unwrap();
    assert!(matches!(stmt, Stmt::Limit(_)));
    assert!(find_stmt(&stmt, &|s| matches!(s, Stmt::Order(p) if !p.ascending)));
}

// S4: UPDATE parent SET id = id + 1 WHERE id = 7; with child.parent_id ON UPDATE CASCADE.
#[test]
fn s4_update_carries_uk_guard_and_cascade_subplan() {
    let mut catalog = Catalog::new();
    let parent = catalog.add_table(TableDef {
        id: TableId(1),
        schema: "sys".into(),
        name: "parent".into(),
        columns: vec![int_col("id", false)],
        keys: vec![KeyDef {
            id: KeyId(1),
            name: "parent_pk".into(),
            kind: KeyKind::Unique,
            table: TableId(1),
            columns: vec!["id".into()],
            references: None,
            on_update: FkAction::Restrict,
            on_delete: FkAction::Restrict,
            hash_index: None,
        }],
        indexes: Vec::new(),
        triggers: Vec::new(),
    });
    catalog.add_table(TableDef {
        id: TableId(2),
        schema: "sys".into(),
        name: "child".into(),
        columns: vec![int_col("id", false), int_col("parent_id", true)],
        keys: vec![KeyDef {
            id: KeyId(2),
            name: "child_fk".into(),
            kind: KeyKind::Foreign,
            table: TableId(2),
            columns: vec!["parent_id".into()],
            references: Some(KeyId(1)),
            on_update: FkAction::Cascade,
            on_delete: FkAction::Restrict,
            hash_index: None,
        }],
        indexes: Vec::new(),
        triggers: Vec::new(),
    });

    let ctx = QueryContext::new(catalog, PlannerConfig::default());
    let base = RelBuilder::new(ctx.new_rel_id(), RelOp::BaseTable).table(parent.clone()).build();
    let pred = Expr::cmp(Expr::column("parent", "id", Subtype::int()), Expr::literal(Atom::int(7)), CmpFlag::Equal);
    let source = RelBuilder::new(ctx.new_rel_id(), RelOp::Select).left(base).exps(vec![pred]).build();
    let new_id = Expr::func("plus", vec![Expr::column("parent", "id", Subtype::int()), Expr::literal(Atom::int(1))], Subtype::int()).alias("id");
    let update = RelBuilder::new(ctx.new_rel_id(), RelOp::Dml(DmlKind::Update))
        .left(source)
        .exps(vec![new_id])
        .table(parent)
        .build();

    let stmt = rel_bin(&ctx, &update).unwrap();
    assert!(find_stmt(&stmt, &|s| matches!(s, Stmt::Exception(_))), "expected a UK guard");
    assert!(find_stmt(&stmt, &|s| matches!(s, Stmt::UpdateCol(p) if p.table.name == "child")), "expected a cascade update on child");
    assert!(find_stmt(&stmt, &|s| matches!(s, Stmt::UpdateCol(p) if p.table.name == "parent")));
}

// S5: CREATE FUNCTION f(x INT) RETURNS INT BEGIN DECLARE y INT; SET y = x*2; RETURN y; END;
#[test]
fn s5_function_compiles_declare_set_return_block() {
    let ctx = QueryContext::new(Catalog::new(), PlannerConfig::default());
    let params = vec![ProcParam { name: "x".into(), data_type: Subtype::int(), mode: ParamMode::In }];
    let body = vec![
        ProcStmt::Declare { name: "y".into(), data_type: Subtype::int() },
        ProcStmt::Set { name: "y".into(), value: Expr::func("mul", vec![Expr::param("x", 0), Expr::literal(Atom::int(2))], Subtype::int()) },
        ProcStmt::Return(Expr::param("y", 0)),
    ];
    let compiled = compile_function(&ctx, "f", params, Some(Subtype::int()), &body).unwrap();
    assert_eq!(compiled.block.len(), 3);
    let has_return = matches!(
        compiled.block.last(),
        Some(Expr::Psm(p, _)) if matches!(p.kind, relbin_planner::expr::PsmKind::Return(_))
    );
    assert!(has_return);
}

#[test]
fn s5_procedure_with_return_is_rejected() {
    let ctx = QueryContext::new(Catalog::new(), PlannerConfig::default());
    let body = vec![ProcStmt::Return(Expr::literal(Atom::int(1)))];
    assert!(compile_function(&ctx, "p", Vec::new(), None, &body).is_err());
}

// S6: CREATE TRIGGER tr AFTER INSERT ON t REFERENCING NEW AS n FOR EACH ROW
//     INSERT INTO audit SELECT * FROM n;
#[test]
fn s6_after_insert_trigger_appends_audit_insert() {
    let mut catalog = Catalog::new();
    let t = catalog.add_table(TableDef {
        id: TableId(1),
        schema: "sys".into(),
        name: "t".into(),
        columns: vec![int_col("a", true)],
        keys: Vec::new(),
        indexes: Vec::new(),
        triggers: Vec::new(),
    });
    let audit = catalog.add_table(TableDef {
        id: TableId(2),
        schema: "sys".into(),
        name: "audit".into(),
        columns: vec![int_col("a", true)],
        keys: Vec::new(),
        indexes: Vec::new(),
        triggers: Vec::new(),
    });

    let ctx = QueryContext::new(catalog, PlannerConfig::default());
    let new_row = RelBuilder::new(ctx.new_rel_id(), RelOp::BaseTable).table(t.clone()).build();
    let audit_insert = RelBuilder::new(ctx.new_rel_id(), RelOp::Dml(DmlKind::Insert))
        .left(new_row.clone())
        .table(audit)
        .build();
    let trigger_body = compile_trigger(
        &ctx,
        "tr",
        TriggerEvent::Insert,
        Some(new_row),
        None,
        &[ProcStmt::Exec(audit_insert)],
    )
    .unwrap();

    assert_eq!(trigger_body.block.len(), 1);
    let audit_rel = match &trigger_body.block[0] {
        Expr::Psm(p, _) => match &p.kind {
            relbin_planner::expr::PsmKind::Rel(rel) => rel.clone(),
            _ => panic!("expected an embedded relational statement"),
        },
        _ => panic!("expected a PSM expression"),
    };
    let stmt = rel_bin(&ctx, &audit_rel).unwrap();
    assert!(find_stmt(&stmt, &|s| matches!(s, Stmt::Append(_))));
    assert!(find_stmt(&stmt, &|s| matches!(s, Stmt::BaseTable(p) if p.table.name == "t")));
}
