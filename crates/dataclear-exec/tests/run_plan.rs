use async_trait::async_trait;
use dataclear_core::FkGraph;
use dataclear_exec::{ExecError, ExecutionPhase, Executor, run};
use dataclear_plan::{ProtectedSet, Step, plan};

/// Records every call and fails the delete of one chosen table.
#[derive(Default)]
struct Recorder {
    calls: Vec<String>,
    fail_table: Option<&'static str>,
}

impl Recorder {
    fn touch(&mut self, call: String, tables: &[String]) -> Result<(), ExecError> {
        self.calls.push(call);
        match self.fail_table {
            Some(fail) if tables.iter().any(|table| table == fail) => Err(ExecError::Other(
                format!("update or delete on table \"{fail}\" violates foreign key constraint"),
            )),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl Executor for Recorder {
    async fn begin(&mut self) -> Result<(), ExecError> {
        self.touch("begin".to_string(), &[])
    }

    async fn commit(&mut self) -> Result<(), ExecError> {
        self.touch("commit".to_string(), &[])
    }

    async fn rollback(&mut self) -> Result<(), ExecError> {
        self.touch("rollback".to_string(), &[])
    }

    async fn delete_all_rows(&mut self, table: &str) -> Result<(), ExecError> {
        self.touch(format!("delete {table}"), &[table.to_string()])
    }

    async fn delete_all_rows_group(&mut self, tables: &[String]) -> Result<(), ExecError> {
        self.touch(format!("group {}", tables.join(",")), tables)
    }
}

fn shop() -> FkGraph {
    FkGraph::build(
        [
            "shop.users",
            "shop.orders",
            "shop.order_items",
            "shop.carts",
            "shop.cart_lines",
        ],
        [
            ("shop.order_items", "shop.orders"),
            ("shop.orders", "shop.users"),
            ("shop.carts", "shop.cart_lines"),
            ("shop.cart_lines", "shop.carts"),
        ],
    )
}

#[tokio::test]
async fn clears_every_step_then_commits() {
    let plan = plan(&shop(), &ProtectedSet::new(["users"])).expect("plan");
    let mut recorder = Recorder::default();

    let summary = run(&plan, &mut recorder).await.expect("run");

    assert_eq!(summary.steps, 3);
    assert_eq!(summary.tables, 4);
    assert_eq!(recorder.calls.first().map(String::as_str), Some("begin"));
    assert_eq!(recorder.calls.last().map(String::as_str), Some("commit"));
    assert!(
        recorder
            .calls
            .contains(&"group shop.carts,shop.cart_lines".to_string())
    );
    let items = recorder
        .calls
        .iter()
        .position(|call| call == "delete shop.order_items");
    let orders = recorder
        .calls
        .iter()
        .position(|call| call == "delete shop.orders");
    assert!(items < orders);
}

#[tokio::test]
async fn failure_mid_plan_rolls_back_everything() {
    let graph = FkGraph::build(
        ["app.a", "app.b", "app.c"],
        [("app.a", "app.b"), ("app.b", "app.c")],
    );
    let plan = plan(&graph, &ProtectedSet::default()).expect("plan");
    assert_eq!(
        plan.steps,
        vec![
            Step::single("app.a"),
            Step::single("app.b"),
            Step::single("app.c")
        ]
    );

    let mut recorder = Recorder {
        fail_table: Some("app.b"),
        ..Recorder::default()
    };
    let err = run(&plan, &mut recorder).await.unwrap_err();

    assert_eq!(err.phase, ExecutionPhase::Step);
    assert_eq!(err.failed_step, Some(1));
    assert_eq!(err.step, Some(Step::single("app.b")));
    assert!(err.rollback_error.is_none());
    assert_eq!(
        recorder.calls,
        vec!["begin", "delete app.a", "delete app.b", "rollback"]
    );
    assert_eq!(
        recorder
            .calls
            .iter()
            .filter(|call| call.as_str() == "rollback")
            .count(),
        1
    );
    assert!(err.to_string().starts_with("step 2 (app.b) failed"));
}

#[tokio::test]
async fn failing_group_step_rolls_back_once() {
    let graph = FkGraph::build(
        ["app.a", "app.b", "app.c", "app.d"],
        [
            ("app.a", "app.b"),
            ("app.b", "app.c"),
            ("app.c", "app.b"),
            ("app.c", "app.d"),
        ],
    );
    let plan = plan(&graph, &ProtectedSet::default()).expect("plan");
    assert_eq!(
        plan.steps,
        vec![
            Step::single("app.a"),
            Step::group(["app.b", "app.c"]),
            Step::single("app.d")
        ]
    );

    let mut recorder = Recorder {
        fail_table: Some("app.c"),
        ..Recorder::default()
    };
    let err = run(&plan, &mut recorder).await.unwrap_err();

    assert_eq!(err.phase, ExecutionPhase::Step);
    assert_eq!(err.failed_step, Some(1));
    assert_eq!(err.step, Some(Step::group(["app.b", "app.c"])));
    assert!(err.rollback_error.is_none());
    assert_eq!(
        recorder.calls,
        vec!["begin", "delete app.a", "group app.b,app.c", "rollback"]
    );
    assert!(!recorder.calls.iter().any(|call| call == "commit"));
    assert!(
        err.to_string()
            .starts_with("step 2 ([cycle] app.b, app.c) failed")
    );
}

#[tokio::test]
async fn empty_plan_still_commits() {
    let graph = FkGraph::build(["app.settings"], Vec::<(String, String)>::new());
    let plan = plan(&graph, &ProtectedSet::new(["settings"])).expect("plan");
    assert!(plan.is_empty());

    let mut recorder = Recorder::default();
    let summary = run(&plan, &mut recorder).await.expect("run");

    assert_eq!(summary.steps, 0);
    assert_eq!(recorder.calls, vec!["begin", "commit"]);
}
