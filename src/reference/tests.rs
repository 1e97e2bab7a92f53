use super::*;
use crate::diagnostics::FileLoc;
use crate::lattice::{BranchKind, Discipline};

fn node_ptr() -> CType {
    CType::pointer_to(CType::Tagged("node".into()))
}

fn loc(line: u32) -> FileLoc {
    FileLoc::at(line, 1)
}

#[test]
fn derivation_is_memoized() {
    let mut arena = RefArena::new();
    let p = arena.declare_local("p", node_ptr(), FUNCTION_SCOPE, true);
    let d1 = arena.derive_pointer_deref(p).expect("*p");
    let d2 = arena.derive_pointer_deref(p).expect("*p again");
    assert_eq!(d1, d2);
    let f1 = arena.derive_field(d1, "next").expect("p->next");
    let f2 = arena.derive_field(d2, "next").expect("p->next again");
    assert!(arena.same(f1, f2));
    assert_eq!(arena.describe(f1), "p->next");
    assert_eq!(arena.base_of(f1), Some(d1));
    assert_eq!(arena.root_base(f1), p);
}

#[test]
fn deref_and_address_cancel() {
    let mut arena = RefArena::new();
    let x = arena.declare_local("x", CType::Int, FUNCTION_SCOPE, true);
    let addr = arena.derive_address(x).expect("&x");
    assert_eq!(arena.describe(addr), "&x");
    assert_eq!(arena.derive_pointer_deref(addr).expect("*&x"), x);

    let p = arena.declare_local("p", node_ptr(), FUNCTION_SCOPE, true);
    let deref = arena.derive_pointer_deref(p).expect("*p");
    assert_eq!(arena.derive_address(deref).expect("&*p"), p);
}

#[test]
fn derived_references_are_unknown_and_inherit_discipline() {
    let mut arena = RefArena::new();
    let p = arena.declare_param(0, "p", node_ptr());
    let deref = arena.derive_pointer_deref(p).expect("*p");
    assert_eq!(arena.definedness(deref), Definedness::Unknown);
    assert_eq!(arena.null_state(deref), NullState::Unknown);
    assert_eq!(
        arena.alias_kind(deref),
        arena.alias_kind(p).derive(AliasKind::UNKNOWN)
    );
}

#[test]
fn unknown_handle_is_an_invariant_violation() {
    let mut arena = RefArena::new();
    let err = arena
        .derive_field(RefId(42), "f")
        .expect_err("no such reference");
    assert!(err.is_invariant());
    assert!(arena.check_handle(RefId(0)).is_err());
}

#[test]
fn conjunction_of_one_reference_is_itself() {
    let mut arena = RefArena::new();
    let a = arena.declare_local("a", node_ptr(), FUNCTION_SCOPE, true);
    let b = arena.declare_local("b", node_ptr(), FUNCTION_SCOPE + 1, false);
    assert_eq!(arena.make_conjunction(a, a).expect("a | a"), a);

    let c = arena.make_conjunction(a, b).expect("a | b");
    assert_eq!(arena.make_conjunction(a, b).expect("memoized"), c);
    assert_eq!(arena.describe(c), "a | b");
    assert_eq!(arena.lex_level(c), FUNCTION_SCOPE + 1);
    assert_eq!(arena.definedness(c), Definedness::Defined.join(Definedness::Undefined));
    assert!(arena.similar(a, c));
    assert!(arena.similar(c, b));
}

#[test]
fn similar_treats_unknown_subscripts_as_wildcards() {
    let mut arena = RefArena::new();
    let a = arena.declare_local("a", CType::array_of(CType::Int, Some(4)), FUNCTION_SCOPE, true);
    let a2 = arena.derive_array_element(a, Some(2)).expect("a[2]");
    let a3 = arena.derive_array_element(a, Some(3)).expect("a[3]");
    let ai = arena.derive_array_element(a, None).expect("a[]");
    assert_eq!(arena.describe(a2), "a[2]");
    assert_eq!(arena.describe(ai), "a[]");
    assert!(arena.similar(a2, ai));
    assert!(arena.similar(ai, a3));
    assert!(!arena.similar(a2, a3));
}

#[test]
fn included_by_walks_bases() {
    let mut arena = RefArena::new();
    let p = arena.declare_local("p", node_ptr(), FUNCTION_SCOPE, true);
    let q = arena.declare_local("q", node_ptr(), FUNCTION_SCOPE, true);
    let deref = arena.derive_pointer_deref(p).expect("*p");
    let field = arena.derive_field(deref, "val").expect("p->val");
    assert!(arena.included_by(field, p));
    assert!(arena.included_by(field, deref));
    assert!(!arena.included_by(p, field));
    assert!(!arena.included_by(field, q));
}

#[test]
fn lexical_levels() {
    let mut arena = RefArena::new();
    let g = arena.declare_global("g", CType::Int);
    let param = arena.declare_param(0, "x", node_ptr());
    let local = arena.declare_local("y", CType::Int, PARAM_SCOPE, true);
    assert_eq!(arena.lex_level(g), GLOBAL_SCOPE);
    assert_eq!(arena.lex_level(param), GLOBAL_SCOPE);
    assert_eq!(arena.lex_level(local), FUNCTION_SCOPE);
    assert!(arena.is_param_rooted(param));
    assert!(arena.is_local_rooted(local));
    assert!(!arena.is_local_rooted(g));
    assert_eq!(FILE_SCOPE, 1);
}

#[test]
fn fix_base_param_rebinds_formals() {
    let mut arena = RefArena::new();
    let formal = arena.declare_param(0, "s", node_ptr());
    let deref = arena.derive_pointer_deref(formal).expect("*s");
    let field = arena.derive_field(deref, "next").expect("s->next");

    let actual = arena.declare_local("list", node_ptr(), FUNCTION_SCOPE, true);
    let bound = arena.fix_base_param(field, &[actual]).expect("bind");
    assert_eq!(arena.describe(bound), "list->next");
    assert_eq!(arena.root_base(bound), actual);

    let missing = arena.fix_base_param(field, &[]).expect("no argument");
    assert!(!arena.is_known(arena.root_base(missing)));
}

#[test]
fn fix_base_rebinds_result() {
    let mut arena = RefArena::new();
    let result = arena.make_result(node_ptr());
    let deref = arena.derive_pointer_deref(result).expect("*result");
    assert_eq!(arena.describe(deref), "*result");
    let lhs = arena.declare_local("n", node_ptr(), FUNCTION_SCOPE, false);
    let bound = arena.fix_base(deref, lhs).expect("bind result");
    assert_eq!(arena.describe(bound), "*n");
}

#[test]
fn setters_record_history_once_per_change() {
    let mut arena = RefArena::new();
    let p = arena.declare_local("p", node_ptr(), FUNCTION_SCOPE, true);
    arena
        .set_null_state(p, NullState::DefinitelyNull, loc(2))
        .expect("null");
    arena
        .set_null_state(p, NullState::DefinitelyNull, loc(2))
        .expect("null again");
    let state = arena.state(p).expect("state");
    assert_eq!(state.null_history().len(), 1);
    assert!(arena.is_definitely_null(p));
    assert!(arena.is_possibly_null(p));
}

#[test]
fn copy_state_notes_the_source() {
    let mut arena = RefArena::new();
    let p = arena.declare_local("p", node_ptr(), FUNCTION_SCOPE, false);
    let q = arena.declare_local("q", node_ptr(), FUNCTION_SCOPE, true);
    arena.copy_state(p, q, loc(4)).expect("p = q");
    assert_eq!(arena.definedness(p), Definedness::Defined);
    let head = arena
        .state(p)
        .and_then(|s| s.def_history().head())
        .expect("history head");
    assert_eq!(head.through, Some(q));
    assert!(arena.state(p).expect("state").is_modified());
}

#[test]
fn allocation_leaves_contents_undefined() {
    let mut arena = RefArena::new();
    let p = arena.declare_local("p", node_ptr(), FUNCTION_SCOPE, false);
    let deref = arena.derive_pointer_deref(p).expect("*p");
    let field = arena.derive_field(deref, "val").expect("p->val");
    arena.set_allocated_complete(p, loc(3)).expect("allocate");
    assert!(arena.is_allocated(p));
    assert_eq!(arena.definedness(field), Definedness::Undefined);

    arena.set_defined_complete(p, loc(4)).expect("define");
    assert_eq!(arena.definedness(field), Definedness::Defined);

    arena.kill_complete(p, loc(5)).expect("release");
    assert!(arena.is_dead(p) && arena.is_dead(field));
    assert!(!arena.is_readable(field));
}

#[test]
fn branch_merge_widens_definedness() {
    let mut arena = RefArena::new();
    let x = arena.declare_local("x", CType::Int, FUNCTION_SCOPE, false);
    let entry = arena.snapshot();
    arena.set_definedness(x, Definedness::Defined, loc(3)).expect("x = 1");
    let taken = arena.restore(entry);
    let conflicts = arena.join(&taken, BranchKind::IfElse, Some(loc(5)), FUNCTION_SCOPE);
    assert!(conflicts.is_empty());
    assert_eq!(arena.definedness(x), Definedness::MaybeUndefined);
    assert!(!arena.is_readable(x));
    let history = arena.state(x).expect("state").def_history();
    assert_eq!(
        history.head().map(|e| e.action),
        Some(crate::history::StateAction::Merged)
    );
}

#[test]
fn exit_branches_keep_the_surviving_path() {
    let mut arena = RefArena::new();
    let x = arena.declare_local("x", CType::Int, FUNCTION_SCOPE, false);
    let entry = arena.snapshot();
    arena.set_definedness(x, Definedness::Defined, loc(3)).expect("x = 1");
    let taken = arena.restore(entry.clone());

    // The taken branch returns: only the alternate reaches the join.
    arena.join(&taken, BranchKind::TrueExit, Some(loc(5)), FUNCTION_SCOPE);
    assert_eq!(arena.definedness(x), Definedness::Undefined);

    arena.restore(entry);
    arena.join(&taken, BranchKind::FalseExit, Some(loc(5)), FUNCTION_SCOPE);
    assert_eq!(arena.definedness(x), Definedness::Defined);
}

#[test]
fn join_skips_references_out_of_scope() {
    let mut arena = RefArena::new();
    let inner = arena.declare_local("t", CType::Int, FUNCTION_SCOPE + 1, false);
    let entry = arena.snapshot();
    arena.set_definedness(inner, Definedness::Defined, loc(3)).expect("t = 1");
    let taken = arena.restore(entry);
    arena.join(&taken, BranchKind::IfElse, Some(loc(5)), FUNCTION_SCOPE);
    assert_eq!(arena.definedness(inner), Definedness::Undefined);
}

#[test]
fn restore_resets_references_created_on_the_abandoned_path() {
    let mut arena = RefArena::new();
    let p = arena.declare_local("p", node_ptr(), FUNCTION_SCOPE, true);
    let entry = arena.snapshot();
    let deref = arena.derive_pointer_deref(p).expect("*p");
    arena.set_defined_complete(deref, loc(2)).expect("define");
    let abandoned = arena.restore(entry);
    assert_eq!(abandoned.len(), arena.len());
    assert_eq!(arena.definedness(deref), Definedness::Unknown);
    assert_eq!(
        abandoned.state(deref).map(RefState::definedness),
        Some(Definedness::Defined)
    );
}

#[test]
fn merge_state_reports_incompatible_disciplines() {
    let mut arena = RefArena::new();
    let a = arena.declare_local("a", node_ptr(), FUNCTION_SCOPE, true);
    let b = arena.declare_local("b", node_ptr(), FUNCTION_SCOPE, true);
    arena.set_alias_kind(a, AliasKind::ONLY, loc(1)).expect("only");
    arena.set_alias_kind(b, AliasKind::SHARED, loc(1)).expect("shared");
    let conflicts = arena
        .merge_state(a, b, BranchKind::IfElse, Some(loc(4)))
        .expect("merge");
    assert_eq!(
        conflicts,
        vec![MergeConflict::Alias {
            taken: AliasKind::ONLY,
            alternate: AliasKind::SHARED
        }]
    );
    assert!(arena.alias_kind(a).is(Discipline::Error));
}

#[test]
fn null_path_gives_up_its_discipline() {
    let mut arena = RefArena::new();
    let a = arena.declare_local("a", node_ptr(), FUNCTION_SCOPE, true);
    let b = arena.declare_local("b", node_ptr(), FUNCTION_SCOPE, true);
    arena.set_alias_kind(a, AliasKind::ONLY, loc(1)).expect("only");
    arena.set_alias_kind(b, AliasKind::SHARED, loc(1)).expect("shared");
    arena
        .set_null_state(b, NullState::DefinitelyNull, loc(2))
        .expect("null");
    let conflicts = arena
        .merge_state(a, b, BranchKind::IfElse, Some(loc(4)))
        .expect("merge");
    assert!(conflicts.is_empty());
    assert_eq!(arena.alias_kind(a), AliasKind::ONLY);
    assert!(arena.is_possibly_null(a));
}

#[test]
fn dump_and_undump_state() {
    let mut arena = RefArena::new();
    let p = arena.declare_local("p", node_ptr(), FUNCTION_SCOPE, true);
    arena
        .set_null_state(p, NullState::PossiblyNull, loc(7))
        .expect("null");
    let state = arena.state(p).expect("state").clone();
    let line = state.dump().expect("dump");
    assert!(!line.contains('\n'));
    assert_eq!(RefState::undump(&line).expect("undump"), state);

    let err = RefState::undump("{not json").expect_err("garbage");
    assert!(matches!(err, crate::error::RefStateError::Undump(_)));
}

#[test]
fn conjunction_without_state_is_strictly_readable_only_if_both_are() {
    let mut arena = RefArena::new();
    let g = arena.declare_global("g", CType::Int);
    let h = arena.declare_global("h", CType::Int);
    let c = arena.make_conjunction(g, h).expect("g | h");
    assert_eq!(arena.definedness(c), Definedness::Unknown);
    assert!(arena.is_strictly_readable(c));

    arena
        .set_definedness(h, Definedness::Undefined, loc(2))
        .expect("undefined");
    assert!(!arena.is_strictly_readable(c));
    assert!(arena.is_strictly_readable(g));
}

#[test]
fn store_through_pointer_defines_allocated_base() {
    let mut arena = RefArena::new();
    let p = arena.declare_local("p", CType::pointer_to(CType::Int), FUNCTION_SCOPE, false);
    arena.set_allocated_complete(p, loc(1)).expect("malloc");
    let first = arena.derive_array_element(p, Some(0)).expect("p[0]");
    let target = arena.derive_pointer_deref(p).expect("*p");
    let one = arena.make_constant("1", CType::Int, MultiVal::Int(1));

    arena.copy_state(target, one, loc(2)).expect("*p = 1");
    assert_eq!(arena.definedness(target), Definedness::Defined);
    assert_eq!(arena.definedness(p), Definedness::Defined);
    assert_eq!(arena.definedness(first), Definedness::Defined);
    let head = arena.state(p).and_then(|s| s.def_history().head()).expect("history");
    assert_eq!(head.through, Some(target));
}

#[test]
fn store_into_element_defines_array() {
    let mut arena = RefArena::new();
    let a = arena.declare_local("a", CType::pointer_to(CType::Int), FUNCTION_SCOPE, false);
    arena.set_allocated_complete(a, loc(1)).expect("malloc");
    let pointee = arena.derive_pointer_deref(a).expect("*a");
    arena.set_undefined(pointee, loc(1)).expect("undefined");
    let later = arena.derive_array_element(a, Some(3)).expect("a[3]");

    arena.define_by_store(later, loc(2), None).expect("a[3] = 1");
    assert_eq!(arena.definedness(a), Definedness::Allocated);

    let any = arena.derive_array_element(a, None).expect("a[i]");
    arena.define_by_store(any, loc(3), None).expect("a[i] = 1");
    assert_eq!(arena.definedness(a), Definedness::Defined);
    assert_eq!(arena.definedness(pointee), Definedness::Defined);
}

#[test]
fn store_does_not_revive_dead_base() {
    let mut arena = RefArena::new();
    let p = arena.declare_local("p", CType::pointer_to(CType::Int), FUNCTION_SCOPE, true);
    let target = arena.derive_pointer_deref(p).expect("*p");
    arena.kill_complete(p, loc(1)).expect("free");
    arena.define_by_store(target, loc(2), None).expect("*p = 1");
    assert_eq!(arena.definedness(p), Definedness::Dead);
}

#[test]
fn unusable_complete_reaches_derived_children() {
    let mut arena = RefArena::new();
    let p = arena.declare_local("p", node_ptr(), FUNCTION_SCOPE, true);
    let node = arena.derive_pointer_deref(p).expect("*p");
    let next = arena.derive_field(node, "next").expect("p->next");
    arena.set_defined_complete(p, loc(1)).expect("defined");
    arena.set_unusable_complete(p, loc(2)).expect("out of scope");
    for id in [p, node, next] {
        assert!(arena.is_unusable(id), "{}", arena.describe(id));
    }
}
