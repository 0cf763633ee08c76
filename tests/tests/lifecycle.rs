//! Single-record transaction lifecycle tests.

use overlay_tests::prelude::*;

mod rename {
    use super::*;

    pub fn scenario() -> Scenario {
        Scenario::new("marcus_becomes_mao")
            .record(fixtures::marcus())
            .step("set_name", |tx| tx.view().set("name", "Mao Zedong"), |a| {
                a.field("name", "Mao Zedong").record(fixtures::marcus())
            })
            .step("set_born", |tx| tx.view().set("born", 1893), |a| a.field("born", 1893))
            .step("set_city", |tx| tx.view().set("city", "Shaoshan"), |a| {
                a.field("city", "Shaoshan").pending(true)
            })
            .step("commit", |tx| tx.commit(), |a| {
                a.record(fixtures::mao())
                    .pending(false)
                    .operations([Operation::Started, Operation::Commit])
            })
            .step("set_born_again", |tx| tx.view().set("born", 1976), |a| {
                a.field("born", 1976).record(fixtures::mao()).pending(true)
            })
            .step("rollback", |tx| tx.rollback(), |a| {
                a.record(fixtures::mao())
                    .field("born", 1893)
                    .pending(false)
                    .operations([Operation::Started, Operation::Commit, Operation::Rollback])
            })
    }

    #[test]
    fn test_marcus_becomes_mao() {
        scenario().run().unwrap();
    }

    #[test]
    fn test_commit_logs_full_delta() {
        let transaction = scenario().run().unwrap();

        let log = transaction.log();
        let commit = &log[1];
        assert_eq!(commit.operation, Operation::Commit);
        assert_eq!(commit.delta.len(), 3);
        assert_eq!(commit.delta.get("born"), Some(&Change::Set(Value::Int(1893))));
        assert_eq!(log[2].delta.get("born"), Some(&Change::Set(Value::Int(1976))));
    }
}

mod round_trip {
    use super::*;

    pub fn scenario(options: TransactionOptions, expected: Vec<Operation>) -> Scenario {
        Scenario::new("round_trip")
            .record(fixtures::marcus())
            .options(options)
            .step("set", |tx| tx.view().set("motto", "Waste no more time"), |a| {
                a.pending(true)
            })
            .step("rollback", |tx| tx.rollback(), |a| a.absent("motto").pending(false))
            .step("set_again", |tx| tx.view().set("motto", "Waste no more time"), |a| {
                a.field("motto", "Waste no more time")
            })
            .step("commit", |tx| tx.commit(), move |a| a.operations(expected))
    }

    #[test]
    fn test_set_rollback_set_commit() {
        let transaction = scenario(
            TransactionOptions::default(),
            vec![Operation::Started, Operation::Rollback, Operation::Commit],
        )
        .run()
        .unwrap();
        assert_eq!(
            transaction.record().get("motto"),
            Some(&Value::from("Waste no more time"))
        );
    }

    #[test]
    fn test_logged_writes_appear_between_lifecycle_entries() {
        let transaction = scenario(
            TransactionOptions::new().log_writes(true),
            vec![
                Operation::Started,
                Operation::Set,
                Operation::Rollback,
                Operation::Set,
                Operation::Commit,
            ],
        )
        .run()
        .unwrap();
        assert_eq!(transaction.log().len(), 5);
    }
}

mod minimal_diffs {
    use super::*;

    pub fn scenario() -> Scenario {
        Scenario::new("minimal_diffs")
            .record(fixtures::marcus())
            .step("override", |tx| tx.view().set("born", 1893), |a| a.pending(true))
            .step("restore_base_value", |tx| tx.view().set("born", 121), |a| {
                a.field("born", 121).pending(false)
            })
            .step("remove", |tx| tx.view().remove("name"), |a| a.absent("name").pending(true))
            .step("commit", |tx| tx.commit(), |a| {
                a.record(record! { "born" => 121 }).pending(false)
            })
    }

    #[test]
    fn test_minimal_diffs() {
        scenario().run().unwrap();
    }
}

mod idempotent_commit {
    use super::*;

    pub fn scenario() -> Scenario {
        Scenario::new("idempotent_commit")
            .record(fixtures::marcus())
            .step("set", |tx| tx.view().set("city", "Rome"), |a| a.pending(true))
            .step("commit", |tx| tx.commit(), |a| a.log_len(2))
            .step("commit_again", |tx| tx.commit(), |a| {
                a.log_len(3).record(record! {
                    "name" => "Marcus Aurelius",
                    "born" => 121,
                    "city" => "Rome"
                })
            })
    }

    #[test]
    fn test_commit_twice() {
        scenario().run().unwrap();
    }
}

mod listener_failures {
    use super::*;

    #[test]
    fn test_failing_after_commit_leaves_delta_pending() {
        // GIVEN
        let data = shared(fixtures::marcus());
        let transaction = Transaction::start(data.clone());
        transaction
            .after(Operation::Commit, |_| Err(ListenerError::new("audit sink down")))
            .unwrap();
        transaction.view().set("city", "Rome").unwrap();

        // WHEN
        let result = transaction.commit();

        // THEN
        assert!(matches!(result, Err(TransactionError::Listener(_))));
        assert_eq!(lock(&data).get("city"), Some(&Value::from("Rome")));
        assert!(transaction.has_changes());
    }

    #[test]
    fn test_failing_before_rollback_keeps_delta() {
        let scenario = Scenario::new("vetoed_rollback")
            .record(fixtures::marcus())
            .step(
                "veto",
                |tx| tx.before(Operation::Rollback, |_| Err(ListenerError::new("vetoed"))),
                |a| a.pending(false),
            )
            .step("set", |tx| tx.view().set("born", 1893), |a| a.pending(true))
            .step("rollback", |tx| tx.rollback(), |a| {
                a.error("vetoed")
                    .pending(true)
                    .operations([Operation::Started, Operation::Rollback])
            });

        scenario.run().unwrap();
    }

    #[test]
    fn test_unknown_hook_name() {
        let transaction = Transaction::start(shared(fixtures::marcus()));

        let result = transaction.before_named("change", |_| Ok(()));

        let message = result.unwrap_err().to_string();
        assert!(message.contains("change"), "{}", message);
    }
}

mod fork {
    use super::*;

    #[test]
    fn test_fork_shares_record_not_delta() {
        // GIVEN
        let data = shared(fixtures::marcus());
        let original = Transaction::start(data.clone());
        original.view().set("born", 1893).unwrap();

        // WHEN
        let fork = original.clone();
        fork.view().set("city", "Shaoshan").unwrap();
        original.rollback().unwrap();

        // THEN
        assert_eq!(fork.view().get("born").unwrap(), Some(Value::Int(1893)));
        assert!(!original.view().contains("city"));

        fork.commit().unwrap();
        assert_eq!(
            *lock(&data),
            record! { "name" => "Marcus Aurelius", "born" => 1893, "city" => "Shaoshan" }
        );
        assert_eq!(original.view().get("city").unwrap(), Some(Value::from("Shaoshan")));
    }
}
