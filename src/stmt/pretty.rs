//! EXPLAIN-style pretty printing, grounded on the teacher's `Distill` trait
//! (`optimizer/plan_node/mod.rs`, `utils::Distill`) built on `pretty-xmlish`.

use super::Stmt;
use pretty_xmlish::{Pretty, PrettyConfig, XmlNode};

pub trait Distill {
    fn distill<'a>(&self) -> XmlNode<'a>;
}

fn label(stmt: &Stmt) -> String {
    match stmt {
        Stmt::Bat(p) => format!("bat({}.{})", p.table.name, p.column),
        Stmt::IdxBat(p) => format!("idxbat(%{})", p.index_name),
        Stmt::BaseTable(p) => format!("basetable({})", p.table.name),
        Stmt::Join(p) => format!("join[{:?}]", p.cmp),
        Stmt::Join2(_) => "join2[range]".into(),
        Stmt::JoinN(_) => "joinN".into(),
        Stmt::ReleqJoin(p) => format!("releqjoin[{}]", p.pairs.len()),
        Stmt::RelJoin(_) => "reljoin".into(),
        Stmt::SemiJoin(p) => format!("semijoin[{:?}]", p.cmp),
        Stmt::Diff(_) => "diff".into(),
        Stmt::Union(_) => "union".into(),
        Stmt::USelect(p) => format!("uselect[{:?}]", p.cmp),
        Stmt::USelect2(_) => "uselect2[range]".into(),
        Stmt::Select2(_) => "select2".into(),
        Stmt::Const(_) => "const".into(),
        Stmt::Project(p) => format!("project[{}]", p.cols.len()),
        Stmt::Reverse(_) => "reverse".into(),
        Stmt::Mark(p) => format!("mark[{}]", p.seed),
        Stmt::Mirror(_) => "mirror".into(),
        Stmt::Order(p) => format!("order[{}]", if p.ascending { "asc" } else { "desc" }),
        Stmt::Reorder(p) => format!("reorder[{}]", if p.ascending { "asc" } else { "desc" }),
        Stmt::Ordered(_) => "ordered".into(),
        Stmt::Limit(p) => format!("limit[{},incl={}]", if p.ascending { "asc" } else { "desc" }, p.inclusive),
        Stmt::Limit2(p) => format!("limit2[{}]", if p.ascending { "asc" } else { "desc" }),
        Stmt::Sample(_) => "sample".into(),
        Stmt::Unique(_) => "unique".into(),
        Stmt::Aggr(p) => format!("aggr[{}]", p.func),
        Stmt::Aggr2(p) => format!("aggr2[{}]", p.func),
        Stmt::Append(_) => "append".into(),
        Stmt::UpdateCol(p) => format!("update_col({}.{})", p.table.name, p.column),
        Stmt::UpdateIdx(p) => format!("update_idx({}.%{})", p.table.name, p.index_name),
        Stmt::Delete(p) => format!("delete({})", p.table.name),
        Stmt::TableClear(p) => format!("table_clear({})", p.table.name),
        Stmt::Nop(p) => format!("Nop[{}]", p.func),
        Stmt::BinOp(p) => format!("binop[{}]", p.func),
        Stmt::UnOp(p) => format!("unop[{}]", p.func),
        Stmt::Convert(p) => format!("convert[{}->{}]", p.from, p.to),
        Stmt::Atom(p) => format!("atom({:?})", p.atom.value),
        Stmt::Var(p) => format!("var({}@{})", p.name, p.level),
        Stmt::List(p) => format!("list[{}]", p.items.len()),
        Stmt::Alias(p) => format!("alias({})", p.name),
        Stmt::Exception(p) => format!("exception[{}]({})", p.sqlstate, p.message),
        Stmt::Catalog(p) => format!("catalog[{:?}]", p.flag),
        Stmt::Trans(p) => format!("trans[{:?}]", p.kind),
        Stmt::Output(_) => "output".into(),
        Stmt::AffectedRows(_) => "affected_rows".into(),
        Stmt::Temp(p) => format!("temp[{}]", p.values.len()),
        Stmt::RsColumn(p) => format!("rs_column({})", p.column),
        Stmt::GenGroup(_) => "gen_group".into(),
    }
}

impl Distill for Stmt {
    fn distill<'a>(&self) -> XmlNode<'a> {
        let children: Vec<_> = self.children().iter().map(|c| c.distill()).collect();
        XmlNode::simple_record(label(self), Vec::new(), children)
    }
}

pub fn explain_to_string(stmt: &Stmt) -> String {
    let mut output = String::with_capacity(1024);
    let mut config = PrettyConfig { indent: 2, need_boundaries: false, width: 120, reduced_spaces: true };
    config.unicode(&mut output, &Pretty::Record(stmt.distill()));
    output
}
