//! Lifecycle synthesis.
//!
//! Builds the members that make a stage's lifecycle explicit, each at most
//! once per node (see [`Memo`](crate::memo::Memo)):
//!
//! | Member | Built for | Body |
//! |---|---|---|
//! | predicate `fooInit()` | stages with a sentinel field | `return f >= 0;` or `return f != default;` |
//! | close `closeFoo()` | stages without a concrete close | `f = default;` |
//! | `doCloseFoo()` | every stage | close body without the dependants call |
//! | `closeFooDependants()` | nodes with closable dependants | each dependant's close, in order |
//! | accessor `f()` | fields read by other nodes | guard prologue, `return f;` |
//! | `<method>Guarded(..)` | stage methods called by other nodes | guard prologue, `return m(..);` |
//!
//! The guard prologue initializes the stage through its no-argument init
//! method when there is one, and asserts the predicate otherwise.
//!
//! Synthesized members are appended to the node's leaf declaration and bound
//! in the registry, so the layout pass can place them next to their node.

use tracing::trace;

use stagegraph_core::ast::{BinaryOp, Block, Expr, MethodDecl, MethodRef, Stmt, TypeRef};
use stagegraph_core::naming;
use stagegraph_core::{CompilationError, DependencyId, MemberLoc, Result, SymbolHash};
use stagegraph_registry::MemberRole;

use crate::context::CompileContext;

/// Lazily builds lifecycle members on top of a [`CompileContext`].
pub struct Synthesizer<'cx> {
    cx: &'cx mut CompileContext,
}

impl<'cx> Synthesizer<'cx> {
    pub fn new(cx: &'cx mut CompileContext) -> Self {
        Self { cx }
    }

    pub fn context(&self) -> &CompileContext {
        &*self.cx
    }

    pub fn context_mut(&mut self) -> &mut CompileContext {
        &mut *self.cx
    }

    fn add_method(
        &mut self,
        node: DependencyId,
        method: MethodDecl,
        role: MemberRole,
    ) -> Result<MemberLoc> {
        let decl = self.cx.graph.node(node).decl;
        let index = self.cx.sources.get_mut(decl).add_method(method);
        let loc = MemberLoc::new(decl, index);
        let id = self.cx.method(loc).id;
        self.cx.registry.bind_method(id, node, role)?;
        trace!(
            node = self.cx.graph.name(node),
            method = %self.cx.method(loc).name,
            ?role,
            "member synthesized"
        );
        Ok(loc)
    }

    /// Implement an abstract declaration with `body`.
    fn implement(&mut self, loc: MemberLoc, body: Block) {
        let method = self.cx.method_mut(loc);
        method.make_concrete();
        method.body = Some(body);
        trace!(method = %method.name, "abstract declaration implemented");
    }

    fn call(&self, loc: MemberLoc) -> Expr {
        Expr::call(self.cx.method_ref(loc), Vec::new())
    }

    fn node_name(&self, node: DependencyId) -> String {
        self.cx.graph.name(node).to_string()
    }

    /// Read of the sentinel field, its default value and its type.
    fn sentinel_parts(&self, node: DependencyId) -> Result<(Expr, Expr, TypeRef)> {
        let stage = self.cx.stage(node)?;
        let loc = stage
            .sentinel()
            .map(|field| field.loc)
            .ok_or_else(|| CompilationError::LifecycleDeclarationConflict {
                stage: stage.name.clone(),
                detail: "no initialized field to derive the lifecycle from".to_string(),
            })?;
        let field = self.cx.field(loc);
        let read = Expr::field(field.as_ref(self.cx.sources.name(loc.decl)));
        let default = field.init.clone().unwrap_or_else(Expr::null);
        Ok((read, default, field.ty.clone()))
    }

    /// The stage's predicate, synthesized from its sentinel field unless
    /// declared concrete.
    pub fn predicate(&mut self, node: DependencyId) -> Result<MemberLoc> {
        let name = self.node_name(node);
        if let Some(loc) = self.cx.stage_mut(node)?.predicate.start(&name, "predicate")? {
            return Ok(loc);
        }

        let stage = self.cx.stage(node)?;
        let declared = stage.declared_predicate;
        let loc = match declared {
            Some(loc) if stage.has_concrete_predicate(&self.cx.sources) => loc,
            _ => {
                let (read, default, ty) = self.sentinel_parts(node)?;
                let check = if default.is_minus_one() && ty.is_integral() {
                    Expr::binary(BinaryOp::Ge, read, Expr::int(0))
                } else {
                    Expr::binary(BinaryOp::Ne, read, default)
                };
                let body = Block::new(vec![Stmt::ret(check)]);
                match declared {
                    Some(loc) => {
                        self.implement(loc, body);
                        loc
                    }
                    None => self.add_method(
                        node,
                        MethodDecl::simple(naming::predicate_name(&name), TypeRef::boolean())
                            .with_body(body),
                        MemberRole::Predicate,
                    )?,
                }
            }
        };
        Ok(self.cx.stage_mut(node)?.predicate.finish(loc))
    }

    /// The stage's close method, generated as a reset of the sentinel field
    /// unless declared concrete.
    pub fn close(&mut self, node: DependencyId) -> Result<MemberLoc> {
        let name = self.node_name(node);
        if let Some(loc) = self.cx.stage_mut(node)?.close.start(&name, "close")? {
            return Ok(loc);
        }

        let stage = self.cx.stage(node)?;
        let declared = stage.declared_close;
        let loc = match declared {
            Some(loc) if stage.has_concrete_close(&self.cx.sources) => loc,
            _ => {
                let (read, default, _) = self.sentinel_parts(node)?;
                let reset = Block::new(vec![Stmt::expr(Expr::assign(read, default))]);
                let loc = match declared {
                    Some(loc) => {
                        self.implement(loc, reset);
                        loc
                    }
                    None => self.add_method(
                        node,
                        MethodDecl::simple(naming::close_name(&name), TypeRef::void())
                            .with_body(reset),
                        MemberRole::Close,
                    )?,
                };
                self.cx.stage_mut(node)?.close_generated = true;
                loc
            }
        };
        Ok(self.cx.stage_mut(node)?.close.finish(loc))
    }

    /// The close variant without the dependants call: a copy of the close
    /// body as it stands when first requested.
    pub fn do_close(&mut self, node: DependencyId) -> Result<MemberLoc> {
        let name = self.node_name(node);
        if let Some(loc) = self.cx.stage_mut(node)?.do_close.start(&name, "doClose")? {
            return Ok(loc);
        }
        let close = self.close(node)?;
        let body = self.cx.method(close).body.clone().unwrap_or_default();
        let loc = self.add_method(
            node,
            MethodDecl::simple(naming::do_close_name(&name), TypeRef::void()).with_body(body),
            MemberRole::DoClose,
        )?;
        Ok(self.cx.stage_mut(node)?.do_close.finish(loc))
    }

    /// The close method of any node: a stage's close, or a method node's
    /// close-dependants.
    pub fn close_of(&mut self, node: DependencyId) -> Result<Option<MemberLoc>> {
        if self.cx.graph.node(node).is_stage() {
            self.close(node).map(Some)
        } else {
            self.close_dependants(node)
        }
    }

    /// Method closing every dependant of `node` that has a close method, each
    /// after its own dependants among them. `None` if there are none.
    pub fn close_dependants(&mut self, node: DependencyId) -> Result<Option<MemberLoc>> {
        let name = self.node_name(node);
        if let Some(done) = self
            .cx
            .graph
            .node_mut(node)
            .close_dependants
            .start(&name, "closeDependants")?
        {
            return Ok(done);
        }

        let mut closes = Vec::new();
        for dependant in self.cx.graph.sorted_dependants(node) {
            if let Some(close) = self.close_of(dependant)? {
                closes.push((dependant, close));
            }
        }

        let loc = if closes.is_empty() {
            None
        } else {
            let from = self.cx.composition_node_of(node);
            let body = closes
                .into_iter()
                .map(|(dependant, close)| {
                    let to = self.cx.composition_node_of(dependant);
                    let target = self.cx.tree.access(from, to, &self.cx.sources);
                    Stmt::expr(Expr::call_on(
                        Some(target),
                        self.cx.method_ref(close),
                        Vec::new(),
                    ))
                })
                .collect();
            Some(self.add_method(
                node,
                MethodDecl::simple(naming::close_dependants_name(&name), TypeRef::void())
                    .with_body(Block::new(body)),
                MemberRole::CloseDependants,
            )?)
        };
        Ok(self.cx.graph.node_mut(node).close_dependants.finish(loc))
    }

    fn guard_prologue(&mut self, node: DependencyId) -> Result<Stmt> {
        let predicate = self.predicate(node)?;
        let check = self.call(predicate);
        let stage = self.cx.stage(node)?;
        Ok(match stage.no_arg_init {
            Some(init) => Stmt::if_then(Expr::not(check), Stmt::expr(self.call(init))),
            None => Stmt::Assert {
                cond: check,
                message: Some(Expr::str(format!("{} should be init", stage.name))),
            },
        })
    }

    fn return_if_not_init(&self, predicate: MemberLoc) -> Stmt {
        Stmt::if_then(Expr::not(self.call(predicate)), Stmt::return_void())
    }

    /// Guarded accessor of a stage field, for reads from other nodes.
    pub fn accessor(&mut self, node: DependencyId, field: SymbolHash) -> Result<MethodRef> {
        let name = self.node_name(node);
        let stage = self.cx.stage_mut(node)?;
        let index = stage
            .field_index(field)
            .ok_or_else(|| CompilationError::ForeignMember {
                member: format!("field {field}"),
                stage: name.clone(),
            })?;
        let entry = &mut stage.fields[index];
        let artifact = format!("accessor {}", entry.name);
        if let Some(loc) = entry.accessor.start(&name, &artifact)? {
            return Ok(self.cx.method_ref(loc));
        }
        let (field_loc, declared) = (entry.loc, entry.declared_accessor);

        let prologue = self.guard_prologue(node)?;
        let field = self.cx.field(field_loc);
        let read = Expr::field(field.as_ref(self.cx.sources.name(field_loc.decl)));
        let (field_name, ty) = (field.name.clone(), field.ty.clone());
        let body = Block::new(vec![prologue, Stmt::ret(read)]);

        let loc = match declared {
            Some(loc) => {
                self.implement(loc, body);
                let id = self.cx.method(loc).id;
                self.cx.registry.bind_method(id, node, MemberRole::Accessor)?;
                loc
            }
            None => self.add_method(
                node,
                MethodDecl::simple(field_name, ty).with_body(body),
                MemberRole::Accessor,
            )?,
        };
        self.cx.stage_mut(node)?.fields[index].accessor.finish(loc);
        Ok(self.cx.method_ref(loc))
    }

    /// Guarded wrapper of a stage method, for calls from other nodes.
    pub fn guarded(&mut self, node: DependencyId, method: SymbolHash) -> Result<MethodRef> {
        let name = self.node_name(node);
        let stage = self.cx.stage_mut(node)?;
        let index = stage
            .stage_method_index(method)
            .ok_or_else(|| CompilationError::ForeignMember {
                member: format!("method {method}"),
                stage: name.clone(),
            })?;
        if let Some(loc) = stage.stage_methods[index].guarded.start(&name, "guarded")? {
            return Ok(self.cx.method_ref(loc));
        }
        let target = stage.stage_methods[index].loc;

        let prologue = self.guard_prologue(node)?;
        let wrapped = self.cx.method(target);
        let args = wrapped
            .params
            .iter()
            .map(|p| Expr::local(p.name.clone()))
            .collect();
        let inner = Expr::call(self.cx.method_ref(target), args);
        let call = if wrapped.ret.is_void() {
            Stmt::expr(inner)
        } else {
            Stmt::ret(inner)
        };
        let mut wrapper =
            MethodDecl::simple(naming::guarded_name(&wrapped.name), wrapped.ret.clone())
                .with_body(Block::new(vec![prologue, call]));
        wrapper.params = wrapped.params.clone();

        let loc = self.add_method(node, wrapper, MemberRole::Guarded)?;
        self.cx.stage_mut(node)?.stage_methods[index].guarded.finish(loc);
        Ok(self.cx.method_ref(loc))
    }

    /// Declare every lifecycle member of `node` and add the lifecycle
    /// prologues to its init and close methods.
    ///
    /// Must run after the node's bodies are guarded: `doClose` copies the
    /// close body as it stands here.
    pub fn prepare(&mut self, node: DependencyId) -> Result<()> {
        if !self.cx.graph.node(node).is_stage() {
            self.close_dependants(node)?;
            return Ok(());
        }

        let predicate = self.predicate(node)?;
        let close_dependants = self.close_dependants(node)?;
        let close = self.close(node)?;
        let do_close = self.do_close(node)?;

        if let Some(close_dependants) = close_dependants {
            let name = self.node_name(node);
            let was_init = naming::was_init_local(&name);
            let inits = self.cx.stage(node)?.init_methods.clone();
            for init in inits {
                let check = self.call(predicate);
                let close_call = Stmt::expr(self.call(close_dependants));
                let body = self.cx.method_mut(init).body_mut();
                body.insert_begin(Stmt::local(TypeRef::boolean(), was_init.clone(), check));
                body.push(Stmt::if_then(Expr::local(was_init.clone()), close_call));
            }
            let close_call = Stmt::expr(self.call(close_dependants));
            self.cx.method_mut(close).body_mut().insert_begin(close_call);
        }

        let guard = self.return_if_not_init(predicate);
        self.cx.method_mut(close).body_mut().insert_begin(guard.clone());
        self.cx.method_mut(do_close).body_mut().insert_begin(guard);

        let forced: Vec<SymbolHash> = self
            .cx
            .stage(node)?
            .fields
            .iter()
            .filter(|f| f.forced_accessor)
            .map(|f| f.id)
            .collect();
        for field in forced {
            self.accessor(node, field)?;
        }
        Ok(())
    }
}
