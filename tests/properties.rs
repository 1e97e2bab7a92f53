use refstate::alias::AliasTable;
use refstate::config::EngineConfig;
use refstate::ctype::CType;
use refstate::diagnostics::FileLoc;
use refstate::history::{History, StateAction};
use refstate::lattice::ExitKind;
use refstate::limits::{SearchBudget, SearchKind};
use refstate::reference::FUNCTION_SCOPE;
use refstate::{AliasKind, Definedness, Exposure, GuardSet, NullState, RefArena, RefId};

#[test]
fn definedness_join_is_idempotent_and_commutative() {
    for a in Definedness::ALL {
        assert_eq!(a.join(a), a, "{a}");
        for b in Definedness::ALL {
            assert_eq!(a.join(b), b.join(a), "{a} / {b}");
        }
    }
}

#[test]
fn null_join_is_idempotent_and_commutative() {
    for a in NullState::ALL {
        assert_eq!(a.join(a), a, "{a:?}");
        for b in NullState::ALL {
            assert_eq!(a.join(b), b.join(a), "{a:?} / {b:?}");
        }
    }
}

#[test]
fn alias_join_is_idempotent_and_commutative() {
    for a in AliasKind::ALL {
        assert!(a.join(a).is_identical(&a), "{a}");
        for b in AliasKind::ALL {
            assert!(a.join(b).is_identical(&b.join(a)), "{a} / {b}");
        }
    }
}

#[test]
fn exposure_join_is_idempotent_and_commutative() {
    for a in Exposure::ALL {
        assert_eq!(a.join(a), a);
        for b in Exposure::ALL {
            assert_eq!(a.join(b), b.join(a));
        }
    }
}

#[test]
fn exit_kind_combine_is_commutative() {
    let kinds = [
        ExitKind::NeverEscape,
        ExitKind::MustExit,
        ExitKind::MayExit,
        ExitKind::MustReturn,
        ExitKind::MayReturn,
        ExitKind::MustReturnExit,
    ];
    for a in kinds {
        for b in kinds {
            assert_eq!(a.combine(b), b.combine(a), "{a:?} / {b:?}");
        }
    }
}

#[test]
fn repeated_history_entry_is_stored_once() {
    let mut h = History::new();
    let loc = Some(FileLoc::at(10, 2));
    h.record(loc, StateAction::Released, Some(RefId(3)));
    h.record(loc, StateAction::Released, Some(RefId(3)));
    assert_eq!(h.len(), 1);
}

fn pointers(n: usize) -> (RefArena, Vec<RefId>) {
    let mut arena = RefArena::new();
    let ids = (0..n)
        .map(|i| {
            arena.declare_local(
                format!("p{i}"),
                CType::pointer_to(CType::Tagged("node".into())),
                FUNCTION_SCOPE,
                true,
            )
        })
        .collect();
    (arena, ids)
}

#[test]
fn must_alias_is_symmetric() {
    let (mut arena, ids) = pointers(4);
    let mut budget = SearchBudget::default();
    let mut table = AliasTable::new();
    table
        .add_must_alias(&mut arena, ids[0], ids[1], &mut budget)
        .expect("p0 = p1");
    table
        .add_must_alias(&mut arena, ids[2], ids[0], &mut budget)
        .expect("p2 = p0");

    for &a in &ids {
        for &b in &ids {
            if a == b {
                continue;
            }
            let ab = table.can_alias(&mut arena, a, &mut budget).expect("closure");
            let ba = table.can_alias(&mut arena, b, &mut budget).expect("closure");
            assert_eq!(ab.contains(&b), ba.contains(&a), "{a} / {b}");
        }
    }
    let p3 = table.can_alias(&mut arena, ids[3], &mut budget).expect("closure");
    assert!(p3.is_empty());
}

#[test]
fn deep_alias_search_is_bounded_and_warns_once() {
    let (mut arena, ids) = pointers(2);
    let (p, q) = (ids[0], ids[1]);
    let mut budget = SearchBudget::new(&EngineConfig {
        alias_search_limit: 8,
        loop_passes: 2,
    });
    let mut table = AliasTable::new();
    table.add_must_alias(&mut arena, p, q, &mut budget).expect("p = q");

    // p->next->next-> ... twenty links deep
    let mut deep = p;
    for _ in 0..20 {
        let node = arena.derive_pointer_deref(deep).expect("deref");
        deep = arena.derive_field(node, "next").expect("next");
    }
    let before = arena.len();
    let found = table.can_alias(&mut arena, deep, &mut budget).expect("closure");
    assert!(found.is_empty());
    assert!(budget.has_warned(SearchKind::AliasClosure));
    assert!(arena.len() - before <= 16);

    table.can_alias(&mut arena, deep, &mut budget).expect("again");
    assert_eq!(budget.take_pending(), vec![SearchKind::AliasClosure]);

    let mut roomy = SearchBudget::new(&EngineConfig {
        alias_search_limit: 64,
        loop_passes: 2,
    });
    let found = table.can_alias(&mut arena, deep, &mut roomy).expect("closure");
    assert_eq!(found.len(), 1);
    assert!(!roomy.has_warned(SearchKind::AliasClosure));
}

#[test]
fn invert_is_an_involution() {
    let (arena, ids) = pointers(3);
    let mut g = GuardSet::new();
    g.add_true_guard(&arena, ids[0]);
    g.add_true_guard(&arena, ids[1]);
    g.add_false_guard(&arena, ids[2]);
    assert_eq!(g.invert().invert(), g);
    assert!(g.invert().must_be_null(ids[0]));
    assert!(g.invert().is_guarded(ids[2]));
    assert_eq!(GuardSet::new().invert(), GuardSet::new());
}
