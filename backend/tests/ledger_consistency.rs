//! Consistency checks for the academy ledger against embedded PostgreSQL.
//!
//! Each test starts its own cluster through [`support::Ledger`], drives the
//! wired services and then inspects the stored rows directly. Set
//! `SKIP_TEST_CLUSTER=1` where embedded PostgreSQL cannot run.

mod support;

use academy::domain::ports::{
    AppendModuleRequest, BuyCourseRequest, ReorderModulesRequest, SetModuleCompletionRequest,
};
use academy::domain::{
    CourseId, ErrorCode, Module, ModuleId, ModuleOrderEntry, ModuleProgress, UserId,
};
use rstest::{fixture, rstest};
use support::Ledger;

const PRICE: i64 = 2_500;

#[fixture]
fn ledger() -> Option<Ledger> {
    Ledger::start_or_skip()
}

fn append(ledger: &Ledger, course_id: CourseId, title: &str) -> Module {
    ledger
        .runtime
        .block_on(ledger.services.sequencing.append_module(AppendModuleRequest {
            course_id,
            title: title.to_owned(),
        }))
        .expect("append module")
        .module
}

fn buy(ledger: &Ledger, user_id: UserId, course_id: CourseId) {
    ledger
        .runtime
        .block_on(
            ledger
                .services
                .enrolment
                .buy_course(BuyCourseRequest { user_id, course_id }),
        )
        .expect("purchase");
}

fn listing(ledger: &Ledger, course_id: CourseId) -> Vec<(String, i32)> {
    ledger
        .runtime
        .block_on(ledger.services.sequencing.list_modules(course_id))
        .expect("list modules")
        .into_iter()
        .map(|module| (module.title, module.position.get()))
        .collect()
}

fn titled(names: &[&str]) -> Vec<(String, i32)> {
    names
        .iter()
        .zip(1..)
        .map(|(name, position)| ((*name).to_owned(), position))
        .collect()
}

fn entry(module: &Module, position: i32) -> ModuleOrderEntry {
    ModuleOrderEntry {
        module_id: module.id,
        position,
    }
}

fn set_completion(
    ledger: &Ledger,
    user_id: UserId,
    module_id: ModuleId,
    completed: bool,
) -> academy::domain::ModuleCompletionOutcome {
    ledger
        .runtime
        .block_on(
            ledger
                .services
                .progress
                .set_module_completion(SetModuleCompletionRequest {
                    user_id,
                    module_id,
                    completed,
                }),
        )
        .expect("set completion")
}

#[rstest]
fn purchase_debits_once_and_provisions_every_module(ledger: Option<Ledger>) {
    let Some(ledger) = ledger else {
        return;
    };
    let user = ledger.seed_user("Ada", 10_000);
    let course = ledger.seed_course("Rust", "Grace", PRICE);
    append(&ledger, course, "Ownership");
    append(&ledger, course, "Borrowing");

    let receipt = ledger
        .runtime
        .block_on(ledger.services.enrolment.buy_course(BuyCourseRequest {
            user_id: user,
            course_id: course,
        }))
        .expect("first purchase");
    let repeat = ledger
        .runtime
        .block_on(ledger.services.enrolment.buy_course(BuyCourseRequest {
            user_id: user,
            course_id: course,
        }))
        .expect_err("second purchase is refused");

    assert_eq!(receipt.provisioned_modules, 2);
    assert_eq!(receipt.balance.minor_units(), 7_500);
    assert_eq!(repeat.code(), ErrorCode::AlreadyPurchased);
    assert_eq!(ledger.balance(user), 7_500);
    assert_eq!(ledger.progress_rows(user, course), 2);
    assert_eq!(ledger.completed_rows(user, course), 0);
    let purchased = ledger
        .runtime
        .block_on(ledger.services.enrolment.has_purchased(user, course))
        .expect("purchase status");
    assert!(purchased);
}

#[rstest]
fn short_balance_leaves_no_trace(ledger: Option<Ledger>) {
    let Some(ledger) = ledger else {
        return;
    };
    let user = ledger.seed_user("Ada", 1_000);
    let course = ledger.seed_course("Rust", "Grace", PRICE);
    append(&ledger, course, "Ownership");

    let error = ledger
        .runtime
        .block_on(ledger.services.enrolment.buy_course(BuyCourseRequest {
            user_id: user,
            course_id: course,
        }))
        .expect_err("balance is too low");

    assert_eq!(error.code(), ErrorCode::InsufficientBalance);
    assert_eq!(ledger.balance(user), 1_000);
    assert_eq!(ledger.progress_rows(user, course), 0);
}

#[rstest]
fn appended_module_reaches_every_purchaser(ledger: Option<Ledger>) {
    let Some(ledger) = ledger else {
        return;
    };
    let course = ledger.seed_course("Rust", "Grace", PRICE);
    append(&ledger, course, "Ownership");
    let learners = [
        ledger.seed_user("Ada", 10_000),
        ledger.seed_user("Alan", 10_000),
        ledger.seed_user("Edsger", 10_000),
    ];
    for learner in learners {
        buy(&ledger, learner, course);
    }

    let appended = ledger
        .runtime
        .block_on(ledger.services.sequencing.append_module(AppendModuleRequest {
            course_id: course,
            title: "Lifetimes".to_owned(),
        }))
        .expect("append");

    assert_eq!(appended.provisioned, learners.len());
    assert_eq!(appended.module.position.get(), 2);
    for learner in learners {
        assert_eq!(ledger.progress_rows(learner, course), 2);
        assert_eq!(ledger.completed_rows(learner, course), 0);
    }
}

#[rstest]
fn deleting_a_module_closes_the_gap(ledger: Option<Ledger>) {
    let Some(ledger) = ledger else {
        return;
    };
    let course = ledger.seed_course("Rust", "Grace", PRICE);
    append(&ledger, course, "A");
    let doomed = append(&ledger, course, "B");
    append(&ledger, course, "C");
    append(&ledger, course, "D");

    let removed = ledger
        .runtime
        .block_on(ledger.services.sequencing.delete_module(doomed.id))
        .expect("delete");

    assert_eq!(removed.course_id, course);
    assert_eq!(removed.shifted, 2);
    assert_eq!(listing(&ledger, course), titled(&["A", "C", "D"]));
    let missing = ledger
        .runtime
        .block_on(ledger.services.sequencing.delete_module(doomed.id))
        .expect_err("already gone");
    assert_eq!(missing.code(), ErrorCode::NotFound);
}

#[rstest]
fn reorder_applies_a_full_permutation(ledger: Option<Ledger>) {
    let Some(ledger) = ledger else {
        return;
    };
    let course = ledger.seed_course("Rust", "Grace", PRICE);
    let first = append(&ledger, course, "A");
    let second = append(&ledger, course, "B");
    let third = append(&ledger, course, "C");

    let reordered = ledger
        .runtime
        .block_on(
            ledger
                .services
                .sequencing
                .reorder_modules(ReorderModulesRequest {
                    course_id: course,
                    entries: vec![entry(&first, 3), entry(&second, 1), entry(&third, 2)],
                }),
        )
        .expect("reorder");

    let titles: Vec<_> = reordered.iter().map(|module| module.title.as_str()).collect();
    assert_eq!(titles, vec!["B", "C", "A"]);
    assert_eq!(listing(&ledger, course), titled(&["B", "C", "A"]));
}

#[rstest]
fn rejected_or_identity_reorders_keep_the_order(ledger: Option<Ledger>) {
    let Some(ledger) = ledger else {
        return;
    };
    let course = ledger.seed_course("Rust", "Grace", PRICE);
    let first = append(&ledger, course, "A");
    let second = append(&ledger, course, "B");
    let third = append(&ledger, course, "C");
    let reorder = |entries: Vec<ModuleOrderEntry>| {
        ledger.runtime.block_on(
            ledger
                .services
                .sequencing
                .reorder_modules(ReorderModulesRequest {
                    course_id: course,
                    entries,
                }),
        )
    };

    reorder(vec![entry(&first, 1), entry(&second, 2), entry(&third, 3)])
        .expect("identity reorder");
    let incomplete = reorder(vec![entry(&first, 2), entry(&second, 1)])
        .expect_err("third module missing");
    let duplicate = reorder(vec![entry(&first, 1), entry(&second, 1), entry(&third, 2)])
        .expect_err("position 1 twice");
    let out_of_range = reorder(vec![entry(&first, 4), entry(&second, 1), entry(&third, 2)])
        .expect_err("position beyond module count");

    assert_eq!(incomplete.code(), ErrorCode::IncompleteReorder);
    assert_eq!(duplicate.code(), ErrorCode::DuplicateOrder);
    assert_eq!(out_of_range.code(), ErrorCode::InvalidOrder);
    assert_eq!(listing(&ledger, course), titled(&["A", "B", "C"]));
}

#[rstest]
fn completing_every_module_issues_one_certificate(ledger: Option<Ledger>) {
    let Some(ledger) = ledger else {
        return;
    };
    let user = ledger.seed_user("Ada", 10_000);
    let course = ledger.seed_course("Rust", "Grace", PRICE);
    let modules = [
        append(&ledger, course, "Ownership"),
        append(&ledger, course, "Borrowing"),
        append(&ledger, course, "Lifetimes"),
    ];
    buy(&ledger, user, course);

    let [first, second, third] = &modules;
    let partial = set_completion(&ledger, user, first.id, true);
    assert_eq!(partial.progress.completed, 1);
    assert!((partial.progress.percentage - 100.0 / 3.0).abs() < 0.01);
    assert!(partial.certificate.is_none());

    set_completion(&ledger, user, second.id, true);
    let finished = set_completion(&ledger, user, third.id, true);
    let certificate = finished.certificate.expect("certificate on completion");
    assert!((finished.progress.percentage - 100.0).abs() < f64::EPSILON);
    assert!(certificate.file_url.starts_with("/uploads/certificates/"));
    let relative = certificate
        .file_url
        .trim_start_matches("/uploads/")
        .to_owned();
    assert!(ledger.artifacts.path().join(relative).is_file());

    set_completion(&ledger, user, third.id, false);
    let again = set_completion(&ledger, user, third.id, true);
    assert_eq!(again.certificate.map(|issued| issued.id), Some(certificate.id));
    assert_eq!(ledger.certificate_rows(user, course), 1);
}

#[rstest]
fn uncompleting_keeps_the_certificate(ledger: Option<Ledger>) {
    let Some(ledger) = ledger else {
        return;
    };
    let user = ledger.seed_user("Ada", 10_000);
    let course = ledger.seed_course("Rust", "Grace", PRICE);
    let only = append(&ledger, course, "Ownership");
    buy(&ledger, user, course);
    set_completion(&ledger, user, only.id, true);

    let undone = set_completion(&ledger, user, only.id, false);
    let stored = ledger
        .runtime
        .block_on(ledger.services.progress_query.certificate(user, course))
        .expect("certificate lookup");

    assert_eq!(undone.progress.completed, 0);
    assert!(stored.is_some());
    assert_eq!(ledger.certificate_rows(user, course), 1);
}

#[rstest]
fn completion_requires_a_purchase(ledger: Option<Ledger>) {
    let Some(ledger) = ledger else {
        return;
    };
    let user = ledger.seed_user("Ada", 10_000);
    let course = ledger.seed_course("Rust", "Grace", PRICE);
    let module = append(&ledger, course, "Ownership");

    let error = ledger
        .runtime
        .block_on(
            ledger
                .services
                .progress
                .set_module_completion(SetModuleCompletionRequest {
                    user_id: user,
                    module_id: module.id,
                    completed: true,
                }),
        )
        .expect_err("no purchase");
    let progress = ledger
        .runtime
        .block_on(ledger.services.progress_query.course_progress(user, course))
        .expect("progress for a visitor");

    assert_eq!(error.code(), ErrorCode::NoProgressRecord);
    assert_eq!(progress.total, 1);
    assert_eq!(progress.completed, 0);
}

#[rstest]
fn reprovision_restores_missing_rows(ledger: Option<Ledger>) {
    let Some(ledger) = ledger else {
        return;
    };
    let user = ledger.seed_user("Ada", 10_000);
    let course = ledger.seed_course("Rust", "Grace", PRICE);
    let first = append(&ledger, course, "Ownership");
    append(&ledger, course, "Borrowing");
    buy(&ledger, user, course);
    ledger.drop_progress_row(user, first.id.get());

    let created = ledger
        .runtime
        .block_on(ledger.services.progress.reprovision_course(course))
        .expect("reprovision");
    let repeat = ledger
        .runtime
        .block_on(ledger.services.progress.reprovision_course(course))
        .expect("second reprovision");

    assert_eq!(created, 1);
    assert_eq!(repeat, 0);
    assert_eq!(ledger.progress_rows(user, course), 2);
}

#[rstest]
fn simultaneous_purchases_debit_once(ledger: Option<Ledger>) {
    let Some(ledger) = ledger else {
        return;
    };
    let user = ledger.seed_user("Ada", 10_000);
    let course = ledger.seed_course("Rust", "Grace", PRICE);
    append(&ledger, course, "Ownership");
    append(&ledger, course, "Borrowing");
    let request = BuyCourseRequest {
        user_id: user,
        course_id: course,
    };

    let (left, right) = ledger.runtime.block_on(async {
        tokio::join!(
            ledger.services.enrolment.buy_course(request),
            ledger.services.enrolment.buy_course(request)
        )
    });

    let outcomes = [left, right];
    let successes = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
    let refusals: Vec<ErrorCode> = outcomes
        .iter()
        .filter_map(|outcome| outcome.as_ref().err().map(|err| err.code()))
        .collect();
    assert_eq!(successes, 1);
    assert_eq!(refusals, vec![ErrorCode::AlreadyPurchased]);
    assert_eq!(ledger.balance(user), 10_000 - PRICE);
    assert_eq!(ledger.progress_rows(user, course), 2);
}

#[rstest]
fn simultaneous_appends_take_distinct_positions(ledger: Option<Ledger>) {
    let Some(ledger) = ledger else {
        return;
    };
    let course = ledger.seed_course("Rust", "Grace", PRICE);
    append(&ledger, course, "Ownership");
    let request = |title: &str| AppendModuleRequest {
        course_id: course,
        title: title.to_owned(),
    };

    let (left, right) = ledger.runtime.block_on(async {
        tokio::join!(
            ledger.services.sequencing.append_module(request("Borrowing")),
            ledger.services.sequencing.append_module(request("Lifetimes"))
        )
    });
    left.expect("first append");
    right.expect("second append");

    let positions: Vec<i32> = listing(&ledger, course)
        .into_iter()
        .map(|(_, position)| position)
        .collect();
    assert_eq!(positions, vec![1, 2, 3]);
}

#[rstest]
fn simultaneous_final_completions_issue_one_certificate(ledger: Option<Ledger>) {
    let Some(ledger) = ledger else {
        return;
    };
    let user = ledger.seed_user("Ada", 10_000);
    let course = ledger.seed_course("Rust", "Grace", PRICE);
    let first = append(&ledger, course, "Ownership");
    let second = append(&ledger, course, "Borrowing");
    let third = append(&ledger, course, "Lifetimes");
    buy(&ledger, user, course);
    set_completion(&ledger, user, first.id, true);
    let toggle = |module_id: ModuleId| SetModuleCompletionRequest {
        user_id: user,
        module_id,
        completed: true,
    };

    let (left, right) = ledger.runtime.block_on(async {
        tokio::join!(
            ledger.services.progress.set_module_completion(toggle(second.id)),
            ledger.services.progress.set_module_completion(toggle(third.id))
        )
    });
    let left = left.expect("second module completes");
    let right = right.expect("third module completes");

    let issued: Vec<_> = [left.certificate, right.certificate]
        .into_iter()
        .flatten()
        .map(|certificate| certificate.id)
        .collect();
    assert!(!issued.is_empty(), "the later toggle sees a complete course");
    assert!(issued.windows(2).all(|pair| pair[0] == pair[1]));
    assert_eq!(ledger.completed_rows(user, course), 3);
    assert_eq!(ledger.certificate_rows(user, course), 1);
}

fn learner_modules(ledger: &Ledger, user_id: UserId, course_id: CourseId) -> Vec<ModuleProgress> {
    ledger
        .runtime
        .block_on(
            ledger
                .services
                .progress_query
                .learner_modules(user_id, course_id),
        )
        .expect("learner modules")
}

#[rstest]
fn learner_modules_follow_position_and_completion(ledger: Option<Ledger>) {
    let Some(ledger) = ledger else {
        return;
    };
    let user = ledger.seed_user("Ada", 10_000);
    let visitor = ledger.seed_user("Alan", 10_000);
    let course = ledger.seed_course("Rust", "Grace", PRICE);
    let first = append(&ledger, course, "Ownership");
    let second = append(&ledger, course, "Borrowing");
    buy(&ledger, user, course);
    set_completion(&ledger, user, second.id, true);
    ledger
        .runtime
        .block_on(
            ledger
                .services
                .sequencing
                .reorder_modules(ReorderModulesRequest {
                    course_id: course,
                    entries: vec![entry(&first, 2), entry(&second, 1)],
                }),
        )
        .expect("reorder");

    let flags = |views: Vec<ModuleProgress>| -> Vec<(String, i32, bool)> {
        views
            .into_iter()
            .map(|view| (view.module.title, view.module.position.get(), view.is_completed))
            .collect()
    };
    assert_eq!(
        flags(learner_modules(&ledger, user, course)),
        vec![
            ("Borrowing".to_owned(), 1, true),
            ("Ownership".to_owned(), 2, false),
        ]
    );
    assert!(
        learner_modules(&ledger, visitor, course)
            .iter()
            .all(|view| !view.is_completed)
    );

    let single = ledger
        .runtime
        .block_on(ledger.services.progress_query.learner_module(user, second.id))
        .expect("single module");
    assert!(single.is_completed);
    assert_eq!(single.module.position.get(), 1);

    let missing = ledger
        .runtime
        .block_on(
            ledger
                .services
                .progress_query
                .learner_modules(user, CourseId::new(course.get() + 1_000)),
        )
        .expect_err("unknown course");
    assert_eq!(missing.code(), ErrorCode::NotFound);
}

#[rstest]
fn enrolled_courses_list_newest_purchase_with_progress(ledger: Option<Ledger>) {
    let Some(ledger) = ledger else {
        return;
    };
    let user = ledger.seed_user("Ada", 10_000);
    let rust = ledger.seed_course("Rust", "Grace", PRICE);
    let sql = ledger.seed_course("SQL", "Edgar", 1_000);
    let ownership = append(&ledger, rust, "Ownership");
    append(&ledger, rust, "Borrowing");
    append(&ledger, rust, "Traits");
    append(&ledger, rust, "Lifetimes");
    buy(&ledger, user, rust);
    buy(&ledger, user, sql);
    set_completion(&ledger, user, ownership.id, true);

    let enrolled = ledger
        .runtime
        .block_on(ledger.services.progress_query.enrolled_courses(user))
        .expect("enrolled courses");

    let summary: Vec<(String, i64, u32, u32)> = enrolled
        .iter()
        .map(|course| {
            (
                course.course.title.clone(),
                course.amount_paid.minor_units(),
                course.progress.total,
                course.progress.completed,
            )
        })
        .collect();
    assert_eq!(
        summary,
        vec![
            ("SQL".to_owned(), 1_000, 0, 0),
            ("Rust".to_owned(), PRICE, 4, 1),
        ]
    );
    assert!((enrolled[1].progress.percentage - 25.0).abs() < f64::EPSILON);
    assert!(enrolled[0].purchased_at >= enrolled[1].purchased_at);

    let stranger = ledger
        .runtime
        .block_on(
            ledger
                .services
                .progress_query
                .enrolled_courses(UserId::random()),
        )
        .expect_err("unknown user");
    assert_eq!(stranger.code(), ErrorCode::NotFound);
}
