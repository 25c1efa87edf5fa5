//! Finals Pass - order final field initialization and expose final fields.
//!
//! ## Initialization order
//!
//! A final field depends on every other final field its initializer reads,
//! directly or through the bodies of methods it calls, and through the field
//! initializers of a merged type it instantiates. Fields are sorted
//! topologically over these dependencies:
//!
//! - fields without dependencies keep their initializer,
//! - the others are initialized at the end of every constructor of their
//!   type, in dependency order. A type without constructors gets a public
//!   no-argument one.
//!
//! Fields caught in a dependency cycle are left alone.
//!
//! ## Accessors
//!
//! Every final field without a same-named method gets a public getter with
//! the field's layout key.

use std::collections::VecDeque;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, trace};

use stagegraph_core::ast::visitor::{Visitor, walk_expr};
use stagegraph_core::ast::{Block, ConstructorDecl, Expr, FieldRef, MethodDecl, Stmt, TypeDecl};
use stagegraph_core::{CompilationError, Result};

use crate::context::CompileContext;

/// Output of the finals pass.
#[derive(Debug, Default)]
pub struct FinalsOutput {
    /// Final fields whose initialization moved into constructors.
    pub moved_to_constructors: usize,
    pub accessors: usize,
}

/// A final field: path of nested-type indices to its type, and its index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct FinalField {
    path: Vec<usize>,
    index: usize,
}

pub struct FinalsPass<'cx> {
    cx: &'cx mut CompileContext,
}

impl<'cx> FinalsPass<'cx> {
    pub fn new(cx: &'cx mut CompileContext) -> Self {
        Self { cx }
    }

    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn run(self) -> Result<FinalsOutput> {
        let root = self.cx.tree.root();
        let merged = self.cx.tree.node_mut(root).merged.as_mut().ok_or_else(|| {
            CompilationError::EmptyComposition {
                node: root.to_string(),
            }
        })?;

        let moved_to_constructors = sort_finals(merged);
        let output = FinalsOutput {
            moved_to_constructors,
            accessors: generate_accessors(merged),
        };
        debug!(
            moved = output.moved_to_constructors,
            accessors = output.accessors,
            "final fields ordered"
        );
        Ok(output)
    }
}

fn type_at<'a>(root: &'a TypeDecl, path: &[usize]) -> &'a TypeDecl {
    path.iter().fold(root, |decl, &i| &decl.nested[i])
}

fn type_at_mut<'a>(root: &'a mut TypeDecl, path: &[usize]) -> &'a mut TypeDecl {
    path.iter().fold(root, |decl, &i| &mut decl.nested[i])
}

/// Every type of the tree with its path, pre-order.
fn all_types(root: &TypeDecl) -> Vec<(Vec<usize>, &TypeDecl)> {
    let mut out = Vec::new();
    let mut stack = vec![(Vec::new(), root)];
    while let Some((path, decl)) = stack.pop() {
        for (i, nested) in decl.nested.iter().enumerate().rev() {
            let mut child = path.clone();
            child.push(i);
            stack.push((child, nested));
        }
        out.push((path, decl));
    }
    out
}

/// Collects the final fields read and the methods called by an expression.
struct DependencyScan<'a> {
    finals: &'a FxHashMap<(String, String), FinalField>,
    fields: Vec<FinalField>,
    calls: Vec<(String, usize)>,
    types: &'a FxHashMap<String, &'a TypeDecl>,
}

impl Visitor for DependencyScan<'_> {
    fn visit_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Field { field, .. } => {
                if let Some(f) = self.finals.get(&(field.owner.clone(), field.name.clone())) {
                    self.fields.push(f.clone());
                }
            }
            Expr::Call { method, .. } => {
                if let Some(index) = self
                    .types
                    .get(&method.owner)
                    .and_then(|decl| decl.method_index_by_ref(method))
                {
                    self.calls.push((method.owner.clone(), index));
                }
            }
            _ => {}
        }
        walk_expr(self, expr);
    }
}

fn sort_finals(root: &mut TypeDecl) -> usize {
    let types_with_paths = all_types(root);
    let types: FxHashMap<String, &TypeDecl> = types_with_paths
        .iter()
        .map(|(_, decl)| (decl.name.clone(), *decl))
        .collect();

    let mut finals = FxHashMap::default();
    let mut order = Vec::new();
    for (path, decl) in &types_with_paths {
        for (index, field) in decl.fields.iter().enumerate() {
            if field.is_final() {
                let key = FinalField {
                    path: path.clone(),
                    index,
                };
                finals.insert((decl.name.clone(), field.name.clone()), key.clone());
                order.push(key);
            }
        }
    }

    let mut dependencies: FxHashMap<FinalField, Vec<FinalField>> = FxHashMap::default();
    let mut dependants: FxHashMap<FinalField, Vec<FinalField>> = FxHashMap::default();
    for field in &order {
        let decl = type_at(root, &field.path);
        let declaration = &decl.fields[field.index];
        let Some(init) = &declaration.init else {
            continue;
        };

        let mut scan = DependencyScan {
            finals: &finals,
            fields: Vec::new(),
            calls: Vec::new(),
            types: &types,
        };
        scan.visit_expr(init);
        if let Some(instantiated) = types.get(&declaration.ty.name) {
            for nested_field in &instantiated.fields {
                scan.visit_field_decl(nested_field);
            }
        }
        let mut scanned = FxHashSet::default();
        while let Some((owner, index)) = scan.calls.pop() {
            if !scanned.insert((owner.clone(), index)) {
                continue;
            }
            if let Some(method) = types.get(&owner).map(|decl| &decl.methods[index]) {
                scan.visit_method_decl(method);
            }
        }

        for dependency in scan.fields {
            if &dependency == field {
                continue;
            }
            let deps = dependencies.entry(field.clone()).or_default();
            if !deps.contains(&dependency) {
                deps.push(dependency.clone());
                dependants.entry(dependency).or_default().push(field.clone());
            }
        }
    }

    let mut visited = FxHashSet::default();
    let mut sorted = VecDeque::new();
    for field in order.iter().filter(|f| !dependencies.contains_key(*f)) {
        visit(field, &dependants, &mut visited, &mut sorted);
    }

    let mut moved = 0;
    let mut position = 0;
    for field in sorted {
        let has_dependencies = dependencies.contains_key(&field);
        let decl = type_at_mut(root, &field.path);
        if has_dependencies && move_into_constructors(decl, field.index) {
            moved += 1;
        }
        if !has_dependencies {
            position = 0;
        }
        decl.fields[field.index].layout = position;
        position += 1;
    }
    moved
}

fn visit(
    field: &FinalField,
    dependants: &FxHashMap<FinalField, Vec<FinalField>>,
    visited: &mut FxHashSet<FinalField>,
    sorted: &mut VecDeque<FinalField>,
) {
    if !visited.insert(field.clone()) {
        return;
    }
    for dependant in dependants.get(field).into_iter().flatten() {
        visit(dependant, dependants, visited, sorted);
    }
    sorted.push_front(field.clone());
}

fn move_into_constructors(decl: &mut TypeDecl, index: usize) -> bool {
    let field = &decl.fields[index];
    if field.is_static() {
        return false;
    }
    let Some(init) = field.init.clone() else {
        return false;
    };
    let target = Expr::field(FieldRef::new(decl.name.clone(), field.name.clone()));

    match decl.constructors.len() {
        0 => decl
            .constructors
            .push(ConstructorDecl::new(Vec::new(), Block::empty())),
        1 => decl.constructors[0].implicit = false,
        _ => {}
    }
    for constructor in &mut decl.constructors {
        constructor
            .body
            .push(Stmt::expr(Expr::assign(target.clone(), init.clone())));
    }
    trace!(type_name = %decl.name, field = %decl.fields[index].name, "final initialization moved");
    decl.fields[index].init = None;
    true
}

fn generate_accessors(decl: &mut TypeDecl) -> usize {
    let mut generated = 0;
    let accessors: Vec<MethodDecl> = decl
        .fields
        .iter()
        .filter(|f| f.is_final() && !decl.has_method_named(&f.name))
        .map(|f| {
            let read = Expr::field(FieldRef::new(decl.name.clone(), f.name.clone()));
            let mut accessor = MethodDecl::simple(f.name.clone(), f.ty.clone())
                .with_body(Block::new(vec![Stmt::ret(read)]));
            accessor.layout = f.layout;
            accessor
        })
        .collect();
    for accessor in accessors {
        decl.add_method(accessor);
        generated += 1;
    }
    for nested in &mut decl.nested {
        generated += generate_accessors(nested);
    }
    generated
}
