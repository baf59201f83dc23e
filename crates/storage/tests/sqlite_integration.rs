use chrono::Duration;
use exam_core::model::{AnswerTracker, QuestionBank, QuestionRecord, Report, SessionMode};
use exam_core::scoring::{ScoreInput, score};
use exam_core::time::fixed_now;
use std::collections::BTreeSet;
use storage::repository::{
    ExamListing, ExamRepository, ImageRepository, ImageResolver, QuestionBankSource,
    ReportRepository, StorageError, StoredImage,
};
use storage::sqlite::SqliteRepository;

fn question(n: u32) -> QuestionRecord {
    QuestionRecord {
        topic_number: 1,
        question_number: n,
        text: format!("Question {n}"),
        options: vec!["yes".into(), "no".into(), "maybe".into()],
        labels: vec!["A".into(), "B".into(), "C".into()],
        checks: vec![true, false, false],
        images: vec![format!("q{n}.png")],
        community_answers: None,
        exam_name: Some("az-900".into()),
        correct_answers: None,
    }
}

fn bank(len: u32) -> QuestionBank {
    QuestionBank::new((1..=len).map(question).collect()).unwrap()
}

fn report_after(secs: i64) -> Report {
    let questions = bank(3).into_questions();
    let mut answers = AnswerTracker::new();
    answers.set_answer(0, BTreeSet::from([0]));
    score(ScoreInput {
        mode: SessionMode::Exam,
        exam_name: "az-900",
        questions: &questions,
        answers: &answers,
        started_at: fixed_now(),
        finished_at: fixed_now() + Duration::seconds(secs),
        time_limit_secs: Some(600),
    })
    .unwrap()
}

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

#[tokio::test]
async fn sqlite_exam_library_roundtrip() {
    let repo = connect("memdb_exams").await;

    let first = bank(4);
    let listing = ExamListing::for_bank("az_900.json", &first, fixed_now());
    repo.save_exam(&listing, &first).await.unwrap();

    let loaded = repo.load_bank("az_900.json").await.unwrap();
    assert_eq!(loaded, first);

    let replacement = bank(2);
    let listing = ExamListing::for_bank("az_900.json", &replacement, fixed_now());
    repo.save_exam(&listing, &replacement).await.unwrap();

    let exams = repo.list_exams().await.unwrap();
    assert_eq!(exams.len(), 1);
    assert_eq!(exams[0].question_count, 2);
    assert_eq!(exams[0].exam_name, "az-900");
    assert_eq!(exams[0].display_name(), "az 900");
    assert_eq!(exams[0].uploaded_at, fixed_now());

    assert!(matches!(
        repo.load_bank("missing.json").await,
        Err(StorageError::NotFound)
    ));
}

#[tokio::test]
async fn sqlite_delete_exam_drops_images() {
    let repo = connect("memdb_images").await;

    let b = bank(1);
    repo.save_exam(&ExamListing::for_bank("az.json", &b, fixed_now()), &b)
        .await
        .unwrap();
    repo.save_image("az-900", "q1.png", &StoredImage::new("q1.png", vec![1, 2, 3]))
        .await
        .unwrap();

    let data_url = repo.resolve_image("az-900", "q1.png").await.unwrap();
    assert_eq!(data_url.as_deref(), Some("data:image/png;base64,AQID"));
    assert_eq!(repo.list_images("az-900").await.unwrap(), vec!["q1.png"]);

    repo.delete_exam("az.json").await.unwrap();
    assert!(repo.list_exams().await.unwrap().is_empty());
    assert_eq!(repo.resolve_image("az-900", "q1.png").await.unwrap(), None);
    assert!(matches!(
        repo.delete_exam("az.json").await,
        Err(StorageError::NotFound)
    ));
}

#[tokio::test]
async fn sqlite_reports_newest_first_and_deletable() {
    let repo = connect("memdb_reports").await;

    let older = repo.append_report(&report_after(30)).await.unwrap();
    let newer = repo.append_report(&report_after(120)).await.unwrap();

    let rows = repo.list_reports().await.unwrap();
    let ids: Vec<_> = rows.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![newer, older]);

    let fetched = repo.get_report(older).await.unwrap();
    assert_eq!(fetched, report_after(30));
    assert_eq!(fetched.user_answers().get(&0), Some(&vec![0]));
    assert_eq!(fetched.questions().len(), 3);

    repo.delete_report(older).await.unwrap();
    assert!(matches!(
        repo.get_report(older).await,
        Err(StorageError::NotFound)
    ));
    assert!(matches!(
        repo.delete_report(older).await,
        Err(StorageError::NotFound)
    ));
}

#[tokio::test]
async fn sqlite_migrate_is_idempotent() {
    let repo = connect("memdb_migrate").await;
    repo.migrate().await.expect("second migrate");
    assert!(repo.list_reports().await.unwrap().is_empty());
}
