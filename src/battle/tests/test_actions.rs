#[cfg(test)]
mod tests {
    use crate::battle::resolver::{execute_action, PlayerAction};
    use crate::battle::state::{Battle, BattleEvent, EventBus, TurnRng};
    use crate::battle::tests::common::{create_test_battle, test_content, TestCombatantBuilder};
    use crate::combatant::{Combatant, CombatantId, Controller, Side};
    use crate::content::ContentLibrary;
    use crate::errors::{ActionError, ActionResult, CapacityReason};
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use schema::StatusKind;

    const HERO: CombatantId = CombatantId(0);

    fn caster(skills: &[&str]) -> TestCombatantBuilder {
        TestCombatantBuilder::new("Hero", Side::Hero)
            .with_skills(skills)
            .with_stats(|s| s.max_mana = 100)
    }

    fn foe(name: &str) -> Combatant {
        TestCombatantBuilder::new(name, Side::Enemy)
            .with_stats(|s| s.max_hp = 500)
            .build()
    }

    fn run(
        battle: &mut Battle,
        content: &ContentLibrary,
        action: PlayerAction,
        rolls: Vec<u8>,
    ) -> (ActionResult<()>, EventBus) {
        let mut rng = TurnRng::new_for_test(rolls);
        let mut bus = EventBus::new();
        let result = execute_action(battle, content, HERO, &action, &mut rng, &mut bus).map(|_| ());
        (result, bus)
    }

    fn skill(id: &str, targets: Vec<CombatantId>) -> PlayerAction {
        PlayerAction::UseSkill {
            skill: id.to_string(),
            targets,
        }
    }

    fn count(bus: &EventBus, predicate: impl Fn(&BattleEvent) -> bool) -> usize {
        bus.events().iter().filter(|e| predicate(e)).count()
    }

    #[test]
    fn test_insufficient_mana_spends_nothing() {
        let hero = caster(&["power_strike"]).with_mana(5).build();
        let mut battle = create_test_battle(vec![hero, foe("Foe")]);
        let content = test_content();

        let (result, bus) = run(&mut battle, &content, skill("power_strike", vec![CombatantId(1)]), vec![]);

        assert_eq!(
            result,
            Err(ActionError::InsufficientResource {
                needed: 10,
                available: 5,
            })
        );
        assert_eq!(battle.get(HERO).unwrap().mana, 5);
        assert!(bus.is_empty());
    }

    #[rstest]
    #[case("unknown skill", skill("nope", vec![CombatantId(1)]), ActionError::UnknownSkill("nope".to_string()))]
    #[case("skill not learned", skill("fireball", vec![CombatantId(1)]), ActionError::SkillNotLearned("fireball".to_string()))]
    #[case("missing target", skill("power_strike", vec![]), ActionError::MissingTarget)]
    #[case("attack an ally", PlayerAction::Attack { target: CombatantId(2) }, ActionError::InvalidTarget(CombatantId(2)))]
    #[case("attack the fallen", PlayerAction::Attack { target: CombatantId(3) }, ActionError::InvalidTarget(CombatantId(3)))]
    #[case("strike a missing id", skill("power_strike", vec![CombatantId(9)]), ActionError::InvalidTarget(CombatantId(9)))]
    #[case("heal an enemy", skill("heal", vec![CombatantId(1)]), ActionError::InvalidTarget(CombatantId(1)))]
    #[case("hex an ally", skill("hex", vec![CombatantId(2)]), ActionError::InvalidTarget(CombatantId(2)))]
    #[case("unknown item", PlayerAction::UseItem { item: "elixir".to_string(), target: None }, ActionError::UnknownItem("elixir".to_string()))]
    #[case("empty inventory", PlayerAction::UseItem { item: "potion".to_string(), target: None }, ActionError::ItemUnavailable("potion".to_string()))]
    fn test_rejected_actions(#[case] desc: &str, #[case] action: PlayerAction, #[case] expected: ActionError) {
        // Arrange: hero, living foe, ally, fallen foe
        let hero = caster(&["power_strike", "heal", "hex"]).build();
        let ally = TestCombatantBuilder::new("Ally", Side::Hero).build();
        let fallen = TestCombatantBuilder::new("Fallen", Side::Enemy).with_hp(0).build();
        let mut battle = create_test_battle(vec![hero, foe("Foe"), ally, fallen]);
        let content = test_content();
        let before = battle.clone();

        // Act
        let (result, bus) = run(&mut battle, &content, action, vec![]);

        // Assert
        assert_eq!(result, Err(expected), "{}", desc);
        assert!(bus.is_empty(), "rejections must not emit events ({})", desc);
        assert_eq!(battle.combatants, before.combatants);
    }

    #[test]
    fn test_fallen_actor_cannot_act() {
        let hero = caster(&[]).with_hp(0).build();
        let mut battle = create_test_battle(vec![hero, foe("Foe")]);
        let content = test_content();

        let (result, _) = run(&mut battle, &content, PlayerAction::Defend, vec![]);

        assert_eq!(result, Err(ActionError::NotYourTurn(HERO)));
    }

    #[test]
    fn test_summon_joins_the_side_once() {
        // Arrange
        let hero = caster(&["summon_wolf"]).with_level(5).build();
        let mut battle = create_test_battle(vec![hero, foe("Foe")]);
        let content = test_content();

        // Act
        let (first, bus) = run(&mut battle, &content, skill("summon_wolf", vec![]), vec![]);
        let (second, _) = run(&mut battle, &content, skill("summon_wolf", vec![]), vec![]);

        // Assert
        assert_eq!(first, Ok(()));
        assert!(bus.events().contains(&BattleEvent::Summoned {
            summoner: HERO,
            summon: CombatantId(2),
        }));
        let wolf = battle.get(CombatantId(2)).unwrap();
        assert_eq!(wolf.definition_id, "dire_wolf");
        assert!(wolf.is_summon);
        assert_eq!(wolf.side, Side::Hero);
        assert_eq!(wolf.controller, Controller::Ai);
        assert_eq!(wolf.level, 5);
        assert!(battle.scheduler.is_dirty());

        assert_eq!(
            second,
            Err(ActionError::CapacityExceeded(CapacityReason::SummonAlreadyUsed(
                "dire_wolf".to_string()
            )))
        );
        assert_eq!(battle.get(HERO).unwrap().mana, 70);
        assert_eq!(battle.combatants.len(), 3);
    }

    #[test]
    fn test_summon_refused_on_a_full_side() {
        let hero = caster(&["summon_wolf"]).build();
        let a = TestCombatantBuilder::new("A", Side::Hero).build();
        let b = TestCombatantBuilder::new("B", Side::Hero).build();
        let mut battle = create_test_battle(vec![hero, a, b, foe("Foe")]);
        let content = test_content();

        let (result, _) = run(&mut battle, &content, skill("summon_wolf", vec![]), vec![]);

        assert_eq!(
            result,
            Err(ActionError::CapacityExceeded(CapacityReason::SideFull { cap: 3 }))
        );
        assert!(battle.side_state(Side::Hero).used_summons.is_empty());
    }

    #[rstest]
    #[case("living ally", CombatantId(1), Some(ActionError::InvalidTarget(CombatantId(1))))]
    #[case("fallen enemy", CombatantId(4), Some(ActionError::InvalidTarget(CombatantId(4))))]
    #[case("fallen ally", CombatantId(2), None)]
    fn test_revive_target_rules(
        #[case] desc: &str,
        #[case] target: CombatantId,
        #[case] expected_error: Option<ActionError>,
    ) {
        let hero = caster(&["resurrect"]).build();
        let ally = TestCombatantBuilder::new("Ally", Side::Hero).build();
        let fallen_ally = TestCombatantBuilder::new("Fallen Ally", Side::Hero)
            .with_hp(0)
            .with_mana(0)
            .with_status(StatusKind::Poison, 3)
            .build();
        let fallen_foe = TestCombatantBuilder::new("Fallen Foe", Side::Enemy).with_hp(0).build();
        let mut battle = create_test_battle(vec![hero, ally, fallen_ally, foe("Foe"), fallen_foe]);
        let content = test_content();

        let (result, bus) = run(&mut battle, &content, skill("resurrect", vec![target]), vec![]);

        match expected_error {
            Some(error) => assert_eq!(result, Err(error), "{}", desc),
            None => {
                assert_eq!(result, Ok(()), "{}", desc);
                let revived = battle.get(target).unwrap();
                assert_eq!(revived.hp, 50);
                assert_eq!(revived.mana, revived.max_mana());
                assert!(revived.status_effects.is_empty());
                assert!(bus.events().contains(&BattleEvent::Revived { target, by: HERO }));
            }
        }
    }

    #[test]
    fn test_revive_refused_on_a_full_side() {
        let hero = caster(&["resurrect"]).build();
        let a = TestCombatantBuilder::new("A", Side::Hero).build();
        let b = TestCombatantBuilder::new("B", Side::Hero).build();
        let fallen = TestCombatantBuilder::new("Fallen", Side::Hero).with_hp(0).build();
        let mut battle = create_test_battle(vec![hero, a, b, fallen, foe("Foe")]);
        let content = test_content();

        let (result, _) = run(&mut battle, &content, skill("resurrect", vec![CombatantId(3)]), vec![]);

        assert_eq!(
            result,
            Err(ActionError::CapacityExceeded(CapacityReason::SideFull { cap: 3 }))
        );
        assert!(battle.get(CombatantId(3)).unwrap().is_dead());
    }

    #[test]
    fn test_self_only_ignores_given_targets() {
        let hero = caster(&["war_cry"]).build();
        let mut battle = create_test_battle(vec![hero, foe("Foe")]);
        let content = test_content();

        let (result, _) = run(&mut battle, &content, skill("war_cry", vec![CombatantId(1)]), vec![]);

        assert_eq!(result, Ok(()));
        let hero = battle.get(HERO).unwrap();
        assert_eq!(hero.buffs.len(), 1);
        assert_eq!(hero.buffs[0].id, "war_cry");
        assert_eq!(hero.stats.atk, 71);
        assert!((hero.modifiers.damage_dealt - 1.2).abs() < 1e-6);
        assert!(battle.get(CombatantId(1)).unwrap().buffs.is_empty());
    }

    #[test]
    fn test_area_skill_hits_every_living_opponent() {
        let hero = caster(&["whirlwind"]).build();
        let fallen = TestCombatantBuilder::new("Fallen", Side::Enemy).with_hp(0).build();
        let mut battle = create_test_battle(vec![hero, foe("A"), fallen, foe("B")]);
        let content = test_content();

        let (result, bus) = run(&mut battle, &content, skill("whirlwind", vec![]), vec![]);

        assert_eq!(result, Ok(()));
        let struck: Vec<CombatantId> = bus
            .events()
            .iter()
            .filter_map(|e| match e {
                BattleEvent::DamageApplied { target, .. } => Some(*target),
                _ => None,
            })
            .collect();
        assert_eq!(struck, vec![CombatantId(1), CombatantId(3)]);
        assert_eq!(battle.get(HERO).unwrap().mana, 75);
    }

    #[rstest]
    #[case("first hit lands", vec![10], false, 2, 1)]
    #[case("first hit parried", vec![10, 90], true, 1, 0)]
    fn test_status_rides_on_the_first_hit(
        #[case] desc: &str,
        #[case] rolls: Vec<u8>,
        #[case] foe_parries: bool,
        #[case] expected_hits: usize,
        #[case] expected_statuses: usize,
    ) {
        let hero = caster(&["twin_fangs"]).build();
        let mut battle = create_test_battle(vec![hero, foe("Foe")]);
        if foe_parries {
            battle.get_mut(CombatantId(1)).unwrap().modifiers.parry_chance = 0.5;
        }
        let content = test_content();

        let (result, bus) = run(&mut battle, &content, skill("twin_fangs", vec![CombatantId(1)]), rolls);

        bus.print_debug_with_message(&format!("Events for test_status_rides_on_the_first_hit [{}]:", desc));
        assert_eq!(result, Ok(()));
        assert_eq!(
            count(&bus, |e| matches!(e, BattleEvent::DamageApplied { .. })),
            expected_hits,
            "{}",
            desc
        );
        assert_eq!(
            count(&bus, |e| matches!(e, BattleEvent::StatusApplied { kind: StatusKind::Bleed, .. })),
            expected_statuses,
            "{}",
            desc
        );
    }

    #[test]
    fn test_pierce_strikes_a_second_target_for_less() {
        let hero = caster(&["piercing_shot"]).with_stats(|s| s.atk = 100).build();
        let unarmored = |name: &str| {
            TestCombatantBuilder::new(name, Side::Enemy)
                .with_stats(|s| {
                    s.max_hp = 500;
                    s.soft_def = 0;
                    s.hard_def = 0;
                })
                .build()
        };
        let mut battle = create_test_battle(vec![hero, unarmored("Primary"), unarmored("Secondary")]);
        let content = test_content();

        let (result, bus) = run(&mut battle, &content, skill("piercing_shot", vec![CombatantId(1)]), vec![]);

        assert_eq!(result, Ok(()));
        let damage: Vec<(CombatantId, u32)> = bus
            .events()
            .iter()
            .filter_map(|e| match e {
                BattleEvent::DamageApplied { target, amount, .. } => Some((*target, *amount)),
                _ => None,
            })
            .collect();
        assert_eq!(damage, vec![(CombatantId(1), 160), (CombatantId(2), 80)]);
    }

    #[test]
    fn test_heal_skill_on_an_ally() {
        let hero = caster(&["heal"]).build();
        let ally = TestCombatantBuilder::new("Ally", Side::Hero).with_hp(10).build();
        let mut battle = create_test_battle(vec![hero, ally, foe("Foe")]);
        let content = test_content();

        let (result, bus) = run(&mut battle, &content, skill("heal", vec![CombatantId(1)]), vec![]);

        // floor(31 * 1.5) = 46
        assert_eq!(result, Ok(()));
        assert_eq!(battle.get(CombatantId(1)).unwrap().hp, 56);
        assert!(bus.events().contains(&BattleEvent::HealApplied {
            target: CombatantId(1),
            amount: 46,
            new_hp: 56,
        }));
    }

    #[test]
    fn test_potion_is_consumed() {
        let hero = caster(&[]).with_hp(20).build();
        let mut battle = create_test_battle(vec![hero, foe("Foe")]);
        battle.side_state_mut(Side::Hero).add_item("potion", 1);
        let content = test_content();
        let potion = || PlayerAction::UseItem {
            item: "potion".to_string(),
            target: None,
        };

        let (first, bus) = run(&mut battle, &content, potion(), vec![]);
        let (second, _) = run(&mut battle, &content, potion(), vec![]);

        assert_eq!(first, Ok(()));
        assert_eq!(battle.get(HERO).unwrap().hp, 100);
        assert!(bus.events().contains(&BattleEvent::HealApplied {
            target: HERO,
            amount: 80,
            new_hp: 100,
        }));
        assert_eq!(battle.side_state(Side::Hero).quantity("potion"), 0);
        assert_eq!(second, Err(ActionError::ItemUnavailable("potion".to_string())));
    }

    #[test]
    fn test_antidote_keeps_stances() {
        let hero = caster(&[]).build();
        let ally = TestCombatantBuilder::new("Ally", Side::Hero)
            .with_status(StatusKind::Poison, 3)
            .with_status(StatusKind::Stun, 1)
            .with_status(StatusKind::Taunt, 2)
            .build();
        let mut battle = create_test_battle(vec![hero, ally, foe("Foe")]);
        battle.side_state_mut(Side::Hero).add_item("antidote", 1);
        let content = test_content();

        let action = PlayerAction::UseItem {
            item: "antidote".to_string(),
            target: Some(CombatantId(1)),
        };
        let (result, bus) = run(&mut battle, &content, action, vec![]);

        assert_eq!(result, Ok(()));
        let ally = battle.get(CombatantId(1)).unwrap();
        assert_eq!(ally.status_effects.len(), 1);
        assert!(ally.has_status(StatusKind::Taunt));
        assert_eq!(count(&bus, |e| matches!(e, BattleEvent::StatusCured { .. })), 2);
    }

    #[test]
    fn test_phoenix_down_needs_a_fallen_target() {
        let hero = caster(&[]).build();
        let fallen = TestCombatantBuilder::new("Fallen", Side::Hero).with_hp(0).build();
        let mut battle = create_test_battle(vec![hero, fallen, foe("Foe")]);
        battle.side_state_mut(Side::Hero).add_item("phoenix_down", 1);
        let content = test_content();

        let untargeted = PlayerAction::UseItem {
            item: "phoenix_down".to_string(),
            target: None,
        };
        let (missing, _) = run(&mut battle, &content, untargeted, vec![]);
        let targeted = PlayerAction::UseItem {
            item: "phoenix_down".to_string(),
            target: Some(CombatantId(1)),
        };
        let (result, _) = run(&mut battle, &content, targeted, vec![]);

        assert_eq!(missing, Err(ActionError::MissingTarget));
        assert_eq!(result, Ok(()));
        assert_eq!(battle.get(CombatantId(1)).unwrap().hp, 50);
        assert_eq!(battle.side_state(Side::Hero).quantity("phoenix_down"), 0);
    }

    #[test]
    fn test_defend_halves_incoming_damage_for_a_turn() {
        let hero = caster(&[]).build();
        let mut battle = create_test_battle(vec![hero, foe("Foe")]);
        let content = test_content();

        let (result, bus) = run(&mut battle, &content, PlayerAction::Defend, vec![]);

        assert_eq!(result, Ok(()));
        let hero = battle.get(HERO).unwrap();
        assert_eq!(hero.buffs.len(), 1);
        assert_eq!(hero.buffs[0].id, "defend");
        assert_eq!(hero.buffs[0].duration, 1);
        assert_eq!(hero.modifiers.damage_taken, 0.5);
        assert!(bus.events().contains(&BattleEvent::BuffApplied {
            target: HERO,
            buff_id: "defend".to_string(),
            is_debuff: false,
            duration: 1,
        }));
    }

    #[test]
    fn test_damage_free_hex_lands_its_status_and_debuff() {
        // Arrange
        let hero = caster(&["hex"]).build();
        let mut battle = create_test_battle(vec![hero, foe("Foe")]);
        let content = test_content();

        // Act: the 50% paralysis roll succeeds
        let (result, bus) = run(&mut battle, &content, skill("hex", vec![CombatantId(1)]), vec![10]);

        // Assert
        assert_eq!(result, Ok(()));
        assert_eq!(battle.get(HERO).unwrap().mana, 90);
        let foe = battle.get(CombatantId(1)).unwrap();
        assert!(foe.has_status(StatusKind::Paralyze));
        assert_eq!(foe.debuffs.len(), 1);
        assert_eq!(foe.debuffs[0].id, "hex");
        assert_eq!(foe.stats.hit, 147);
        assert_eq!(foe.stats.flee, 82);
        assert_eq!(
            count(&bus, |e| matches!(e, BattleEvent::DamageApplied { .. })),
            0
        );
        assert!(bus.events().contains(&BattleEvent::StatusApplied {
            target: CombatantId(1),
            kind: StatusKind::Paralyze,
            duration: 2,
        }));
        assert!(bus.events().contains(&BattleEvent::BuffApplied {
            target: CombatantId(1),
            buff_id: "hex".to_string(),
            is_debuff: true,
            duration: 2,
        }));
    }
}
