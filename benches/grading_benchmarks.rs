//! Benchmarks for the grading pipeline.
//!
//! Benchmarks cover:
//! - statement extraction from document text
//! - repair proposals
//! - rubric scoring of SELECT statements
//! - a full evaluation on in-memory SQLite
//!
//! Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use sqlgrade::db::SqliteBackend;
use sqlgrade::eval::{extract, keys, propose_fix, Ledger, ScoreCalculator, SolutionEvaluator};

// ---------------------------------------------------------------------------
// Solution text
// ---------------------------------------------------------------------------

const SCHEMA: &str = "\
1. RELATIONAL SCHEMA
THE SCRIPT BELOW CREATES ALL TABLES.
CREATE TABLE DEPARTMENT (
    ID INTEGER PRIMARY KEY,
    CODE VARCHAR(10) NOT NULL UNIQUE,
    NAME VARCHAR(100) NOT NULL
);
CREATE TABLE EMPLOYEE (
    ID INTEGER PRIMARY KEY,
    NAME VARCHAR(100) NOT NULL,
    SALARY INTEGER CHECK (SALARY > 0),
    HIRED DATE,
    DEPARTMENT_ID INTEGER REFERENCES DEPARTMENT (ID) ON DELETE CASCADE
);
CREATE TABLE PROJECT (
    ID INTEGER PRIMARY KEY,
    TITLE VARCHAR(200)
);
";

const DATA: &str = "\
2. DATA
INSERT INTO DEPARTMENT (ID, CODE, NAME) VALUES (1, 'RD', 'RESEARCH');
INSERT INTO DEPARTMENT (ID, CODE, NAME) VALUES (2, 'OPS', 'OPERATIONS');
INSERT INTO EMPLOYEE (ID, NAME, SALARY, HIRED, DEPARTMENT_ID) VALUES (1, 'ADA', 5000, '2019.04.01', 1);
INSERT INTO EMPLOYEE (ID, NAME, SALARY, HIRED, DEPARTMENT_ID) VALUES (2, 'ALAN', 4200, '2020.09.15', 2);
INSERT INTO PROJECT (ID, TITLE) VALUES (1, 'ENGINE');
";

const QUERIES: &str = "\
3. QUERIES
QUERY 1: EMPLOYEES WITH THEIR DEPARTMENT
SELECT E.NAME, D.NAME FROM EMPLOYEE E JOIN DEPARTMENT D ON D.ID = E.DEPARTMENT_ID;
QUERY 2: DEPARTMENTS WITHOUT EMPLOYEES
SELECT D.NAME FROM DEPARTMENT D LEFT JOIN EMPLOYEE E ON E.DEPARTMENT_ID = D.ID WHERE E.ID IS NULL;
QUERY 3: HEADCOUNT
SELECT D.NAME, COUNT(E.ID) FROM DEPARTMENT D JOIN EMPLOYEE E ON E.DEPARTMENT_ID = D.ID
GROUP BY D.NAME HAVING COUNT(E.ID) > 0 ORDER BY D.NAME;
QUERY 4: ABOVE AVERAGE
SELECT NAME FROM EMPLOYEE WHERE SALARY > (SELECT AVG(SALARY) FROM EMPLOYEE);
QUERY 5: ALL NAMES
SELECT NAME FROM EMPLOYEE UNION SELECT TITLE FROM PROJECT;
";

const RUBRIC: &str = r#"{
    "defining primary keys of tables": { "maxScore": 1, "queryType": "DDL" },
    "using integrity constraints": { "maxScore": 1, "queryType": "DDL" },
    "using ON UPDATE/DELETE for foreign key": { "maxScore": 1, "queryType": "DDL" },
    "statements to fill tables by data": { "maxScore": 1, "queryType": "DML" },
    "outer join of tables": { "maxScore": 1, "queryType": "SELECT" },
    "inner join of tables": { "maxScore": 1, "queryType": "SELECT" },
    "condition on the data": { "maxScore": 1, "queryType": "SELECT" },
    "aggregation": { "maxScore": 2, "queryType": "SELECT" },
    "sorting and pagination": { "maxScore": 1, "queryType": "SELECT" },
    "set operations": { "maxScore": 1, "queryType": "SELECT" },
    "inner SELECT": { "maxScore": 1, "queryType": "SELECT" },
    "corresponding to the relational model": { "maxScore": 3, "queryType": "MODEL" }
}"#;

fn solution() -> String {
    format!("{}{}{}", SCHEMA, DATA, QUERIES)
}

// ---------------------------------------------------------------------------
// Benchmark groups
// ---------------------------------------------------------------------------

fn bench_extraction(c: &mut Criterion) {
    let mut group = c.benchmark_group("extraction");

    let single = solution();
    let cases = [
        ("schema", SCHEMA.to_string()),
        ("data", DATA.to_string()),
        ("queries", QUERIES.to_string()),
        ("solution", single.clone()),
        ("solution_x10", single.repeat(10)),
    ];

    for (name, text) in &cases {
        group.bench_with_input(BenchmarkId::new("extract", name), text, |b, text| {
            b.iter(|| extract(black_box(text)));
        });
    }

    group.finish();
}

fn bench_repair(c: &mut Criterion) {
    let mut group = c.benchmark_group("repair");

    let cases = [
        (
            "count_alias",
            "SELECT D.NAME, COUNT(E) FROM DEPARTMENT D JOIN EMPLOYEE E USING (DEPARTMENT_ID) GROUP BY D.NAME;",
            "column \"e\" does not exist",
        ),
        (
            "interval",
            "SELECT NAME FROM EMPLOYEE WHERE HIRED > NOW() - INTERVAL '2 YEARS';",
            "Cannot parse \"INTERVAL\" constant \"2 YEARS\"",
        ),
        (
            "sequence",
            "CREATE SEQUENCE EMPLOYEE_SEQ START 100 INCREMENT 1;",
            "syntax error at or near \"100\" in CREATE SEQUENCE ... START",
        ),
        (
            "no_fix",
            "SELECT * FROM MISSING;",
            "no such table: MISSING",
        ),
    ];

    for (name, statement, message) in &cases {
        group.bench_function(BenchmarkId::new("propose_fix", name), |b| {
            b.iter(|| propose_fix(black_box(statement), black_box(message)));
        });
    }

    group.finish();
}

fn bench_scoring(c: &mut Criterion) {
    let mut group = c.benchmark_group("scoring");

    let ledger = Ledger::from_json(RUBRIC).unwrap();
    let statements = extract(QUERIES);

    group.bench_function("score_selects", |b| {
        b.iter(|| {
            let mut ledger = ledger.clone();
            let mut calculator = ScoreCalculator::new(&mut ledger);
            for statement in &statements {
                calculator.score_select(black_box(statement), true);
            }
            ledger.get(keys::AGGREGATION).map(|c| c.score())
        });
    });

    group.finish();
}

fn bench_evaluation(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluation");
    group.sample_size(20);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();
    let ledger = Ledger::from_json(RUBRIC).unwrap();
    let text = solution();

    group.bench_function("sqlite_full_run", |b| {
        b.iter(|| {
            runtime.block_on(async {
                let backend = SqliteBackend::open_in_memory().unwrap();
                let mut evaluator = SolutionEvaluator::new(backend);
                evaluator
                    .evaluate(ledger.clone(), black_box(&text))
                    .await
                    .unwrap()
            })
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_extraction,
    bench_repair,
    bench_scoring,
    bench_evaluation,
);
criterion_main!(benches);
