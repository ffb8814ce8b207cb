//! Expression visitor/rewriter traits, in the shape of the teacher's
//! `ExprRewriter`/`ExprVisitor` (`expr/utils.rs`).

use super::{AggrExpr, AtomExpr, CmpExpr, ColumnExpr, ConvertExpr, Expr, FuncExpr};

pub trait ExprRewriter {
    fn rewrite_expr(&mut self, expr: Expr) -> Expr {
        match expr {
            Expr::Atom(a, m) => self.rewrite_atom(*a, m),
            Expr::Convert(c, m) => self.rewrite_convert(*c, m),
            Expr::Func(f, m) => self.rewrite_func(*f, m),
            Expr::Aggr(a, m) => self.rewrite_aggr(*a, m),
            Expr::Column(c, m) => self.rewrite_column(*c, m),
            Expr::Cmp(c, m) => self.rewrite_cmp(*c, m),
            Expr::Psm(p, m) => Expr::Psm(p, m),
        }
    }

    fn rewrite_atom(&mut self, a: AtomExpr, m: super::ExprMeta) -> Expr {
        Expr::Atom(Box::new(a), m)
    }

    fn rewrite_convert(&mut self, mut c: ConvertExpr, m: super::ExprMeta) -> Expr {
        let child = self.rewrite_expr(*c.child);
        c.child = Box::new(child);
        Expr::Convert(Box::new(c), m)
    }

    fn rewrite_func(&mut self, mut f: FuncExpr, m: super::ExprMeta) -> Expr {
        f.args = f.args.into_iter().map(|e| self.rewrite_expr(e)).collect();
        Expr::Func(Box::new(f), m)
    }

    fn rewrite_aggr(&mut self, mut a: AggrExpr, m: super::ExprMeta) -> Expr {
        a.arg = a.arg.map(|e| Box::new(self.rewrite_expr(*e)));
        a.arg2 = a.arg2.map(|e| Box::new(self.rewrite_expr(*e)));
        Expr::Aggr(Box::new(a), m)
    }

    fn rewrite_column(&mut self, c: ColumnExpr, m: super::ExprMeta) -> Expr {
        Expr::Column(Box::new(c), m)
    }

    fn rewrite_cmp(&mut self, mut c: CmpExpr, m: super::ExprMeta) -> Expr {
        c.l = Box::new(self.rewrite_expr(*c.l));
        c.r = Box::new(self.rewrite_expr(*c.r));
        c.f = c.f.map(|f| Box::new(self.rewrite_expr(*f)));
        Expr::Cmp(Box::new(c), m)
    }
}

pub trait ExprVisitor {
    fn visit_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Atom(a, _) => {
                if let AtomExpr::ValueList(vs) = a.as_ref() {
                    for v in vs {
                        self.visit_expr(v);
                    }
                }
            }
            Expr::Convert(c, _) => self.visit_expr(&c.child),
            Expr::Func(f, _) => {
                for a in &f.args {
                    self.visit_expr(a);
                }
            }
            Expr::Aggr(a, _) => {
                if let Some(arg) = &a.arg {
                    self.visit_expr(arg);
                }
                if let Some(arg2) = &a.arg2 {
                    self.visit_expr(arg2);
                }
            }
            Expr::Column(_, _) => {}
            Expr::Cmp(c, _) => {
                self.visit_expr(&c.l);
                self.visit_expr(&c.r);
                if let Some(f) = &c.f {
                    self.visit_expr(f);
                }
            }
            Expr::Psm(..) => {}
        }
    }
}
