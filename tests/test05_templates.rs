use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use sql_template::prelude::*;

const USERS: &str = "SELECT *
	FROM users
	WHERE id IN /*% in \"ids\" %*/(1, 2)
	AND name = /*% p \"name\" %*/'John Doe'
	/*%- if .onlyMale %*/
	AND sex = 'MALE'
	/*%- end%*/
	ORDER BY /*% .order %*/id";

fn users_params(only_male: bool) -> Params {
    Params::new()
        .with("ids", vec![1, 2, 3])
        .with("order", "name DESC")
        .with("onlyMale", only_male)
        .with("name", "Alex")
}

fn fixed_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2020, 2, 29)
        .and_then(|d| d.and_hms_opt(23, 59, 58))
        .unwrap()
}

#[test]
fn exec_full_template() -> Result<(), SqlTemplateError> {
    let (sql, args) = SqlTemplate::new(DialectKind::Postgres).exec(USERS, &users_params(true))?;
    assert_eq!(
        sql,
        "SELECT *
	FROM users
	WHERE id IN ($1, $2, $3)
	AND name = $4
	AND sex = 'MALE'
	ORDER BY name DESC"
    );
    assert_eq!(
        args,
        vec![Value::Int(1), Value::Int(2), Value::Int(3), Value::from("Alex")]
    );
    Ok(())
}

#[test]
fn exec_named_full_template() -> Result<(), SqlTemplateError> {
    let (sql, args) =
        SqlTemplate::new(DialectKind::Postgres).exec_named(USERS, &users_params(false))?;
    assert_eq!(
        sql,
        "SELECT *
	FROM users
	WHERE id IN (:ids__1, :ids__2, :ids__3)
	AND name = :name
	ORDER BY name DESC"
    );
    let names: Vec<_> = args.iter().map(|arg| arg.name.as_str()).collect();
    assert_eq!(names, ["ids__1", "ids__2", "ids__3", "name"]);
    Ok(())
}

#[test]
fn json_params_render_like_native_ones() -> Result<(), SqlTemplateError> {
    let params = Params::try_from(serde_json::json!({
        "ids": [1, 2, 3],
        "order": "name DESC",
        "onlyMale": true,
        "name": "Alex"
    }))?;
    let (sql, args) = SqlTemplate::new(DialectKind::Postgres).exec(USERS, &params)?;
    assert!(sql.contains("AND sex = 'MALE'"));
    assert_eq!(args.len(), 4);
    Ok(())
}

#[test]
fn empty_params() -> Result<(), SqlTemplateError> {
    let s = "SELECT *
	FROM users";
    let tpl = SqlTemplate::new(DialectKind::Postgres);
    assert_eq!(tpl.exec(s, &Params::new())?, (s.to_string(), vec![]));
    assert_eq!(tpl.exec_named(s, &Params::new())?, (s.to_string(), vec![]));
    Ok(())
}

#[test]
fn unknown_function_fails_to_parse() {
    let s = USERS.replace("p \"name\"", "pp \"name\"");
    let tpl = SqlTemplate::new(DialectKind::Postgres);
    assert!(matches!(
        tpl.exec(&s, &users_params(true)),
        Err(SqlTemplateError::TemplateSyntax(_))
    ));
    assert!(matches!(
        tpl.exec_named(&s, &users_params(true)),
        Err(SqlTemplateError::TemplateSyntax(_))
    ));
}

#[test]
fn unknown_param_on_p_leaves_a_marker() {
    let s = USERS.replace("p \"name\"", "p \"userName\"");
    let err = SqlTemplate::new(DialectKind::Postgres)
        .exec(&s, &users_params(true))
        .unwrap_err();
    assert_eq!(
        err.partial_sql(),
        Some(
            "SELECT *
	FROM users
	WHERE id IN ($1, $2, $3)
	AND name = /*! unknown param: userName */
	AND sex = 'MALE'
	ORDER BY name DESC"
        )
    );
    assert_eq!(
        err.param_errors(),
        &[ParamError::UnknownParam("userName".into())]
    );
}

#[test]
fn unknown_param_on_in_leaves_a_marker() {
    let s = USERS.replace("in \"ids\"", "in \"idList\"");
    let err = SqlTemplate::new(DialectKind::Postgres)
        .exec(&s, &users_params(true))
        .unwrap_err();
    assert_eq!(
        err.partial_sql(),
        Some(
            "SELECT *
	FROM users
	WHERE id IN /*! unknown param: idList */
	AND name = $1
	AND sex = 'MALE'
	ORDER BY name DESC"
        )
    );
}

#[test]
fn repeated_in_reuses_sub_arguments() -> Result<(), SqlTemplateError> {
    let s = "SELECT *
FROM users
WHERE name IN /*% in \"keywords\" %*/('')
OR email IN /*% in \"keywords\" %*/('')";
    let params = Params::new().with("keywords", vec!["foo", "bar"]);
    let tpl = SqlTemplate::new(DialectKind::Postgres);

    let (sql, args) = tpl.exec(s, &params)?;
    assert_eq!(
        sql,
        "SELECT *
FROM users
WHERE name IN ($1, $2)
OR email IN ($1, $2)"
    );
    assert_eq!(args, vec![Value::from("foo"), Value::from("bar")]);

    let (sql, args) = tpl.exec_named(s, &params)?;
    assert_eq!(
        sql,
        "SELECT *
FROM users
WHERE name IN (:keywords__1, :keywords__2)
OR email IN (:keywords__1, :keywords__2)"
    );
    assert_eq!(
        args,
        vec![
            NamedArg::new("keywords__1", "foo".into()),
            NamedArg::new("keywords__2", "bar".into()),
        ]
    );
    Ok(())
}

const INSERT: &str = "INSERT INTO users (
	    name
	  , created_at
	  , updated_at
	) VALUES (
	    /*% p \"name\" %*/'John Doe'
	  , /*% FN %*/'2000-01-01'
	  , /*% FN %*/'2000-01-01'
	)";

#[test]
fn time_binds_once() -> Result<(), SqlTemplateError> {
    let s = INSERT.replace("FN", "time");
    let tpl = SqlTemplate::new(DialectKind::Postgres).with_clock(Clock::fixed(fixed_time()));
    let params = Params::new().with("name", "test");

    let (sql, args) = tpl.exec(&s, &params)?;
    assert!(sql.contains("    $1\n\t  , $2\n\t  , $2\n"), "{sql}");
    assert_eq!(args, vec![Value::from("test"), Value::Timestamp(fixed_time())]);

    let (sql, args) = tpl.exec_named(&s, &params)?;
    assert!(sql.contains("    :name\n\t  , :time__\n\t  , :time__\n"), "{sql}");
    assert_eq!(args[1], NamedArg::new("time__", Value::Timestamp(fixed_time())));
    assert_eq!(args.len(), 2);
    Ok(())
}

#[test]
fn now_binds_every_call() -> Result<(), SqlTemplateError> {
    let s = INSERT.replace("FN", "now");
    let tpl = SqlTemplate::new(DialectKind::Postgres).with_clock(Clock::fixed(fixed_time()));
    let params = Params::new().with("name", "test");

    let (sql, args) = tpl.exec(&s, &params)?;
    assert!(sql.contains("    $1\n\t  , $2\n\t  , $3\n"), "{sql}");
    assert_eq!(args.len(), 3);

    let (sql, args) = tpl.exec_named(&s, &params)?;
    assert!(sql.contains("    :name\n\t  , :now__1\n\t  , :now__2\n"), "{sql}");
    let names: Vec<_> = args.iter().map(|arg| arg.name.as_str()).collect();
    assert_eq!(names, ["name", "now__1", "now__2"]);
    Ok(())
}

fn paging(args: &[Value]) -> Result<Value, SqlTemplateError> {
    match args {
        [Value::Int(offset), Value::Int(limit)] => {
            Ok(Value::Text(format!("OFFSET {offset} LIMIT {limit}")))
        }
        _ => Err(SqlTemplateError::ExecutionError(format!(
            "paging expects two integers, got {args:?}"
        ))),
    }
}

const SEARCH: &str = "SELECT *
	FROM users
	WHERE name LIKE /*% infix \"name\" %*/''
	/*% paging 3 50 %*/";

const SEARCH_SQL: &str = "SELECT *
	FROM users
	WHERE name LIKE '%' || $1 || '%' ESCAPE '\\'
	OFFSET 3 LIMIT 50";

#[test]
fn custom_functions_do_not_override_builtins() -> Result<(), SqlTemplateError> {
    let tpl = SqlTemplate::new(DialectKind::Postgres)
        .add_func("paging", paging)
        .add_func("infix", |_: &[Value]| -> Result<Value, SqlTemplateError> {
            panic!("built-in infix must win")
        });
    assert_eq!(tpl.funcs().len(), 1);

    let (sql, args) = tpl.exec(SEARCH, &Params::new().with("name", "Alex"))?;
    assert_eq!(sql, SEARCH_SQL);
    assert_eq!(args, vec![Value::from("Alex")]);
    Ok(())
}

#[test]
fn custom_functions_registered_in_bulk() -> Result<(), SqlTemplateError> {
    let paging_fn: CustomFn = Arc::new(paging);
    let infix_fn: CustomFn = Arc::new(|_: &[Value]| -> Result<Value, SqlTemplateError> {
        Ok(Value::Null)
    });
    let funcs = vec![("paging", paging_fn), ("infix", infix_fn)];
    let tpl = SqlTemplate::new(DialectKind::Postgres).add_funcs(funcs);
    let (sql, _) = tpl.exec(SEARCH, &Params::new().with("name", "Alex"))?;
    assert_eq!(sql, SEARCH_SQL);
    Ok(())
}

#[test]
fn custom_function_errors_abort() {
    let tpl = SqlTemplate::new(DialectKind::Postgres).add_func("paging", paging);
    let err = tpl
        .exec("SELECT 1 /*% paging \"x\" 1 %*/", &Params::new())
        .unwrap_err();
    assert!(matches!(err, SqlTemplateError::ExecutionError(_)));
}

#[test]
fn else_if_chains() -> Result<(), SqlTemplateError> {
    let s = "SELECT * FROM users
/*%- if eq_admin %*/
WHERE 1 = 1
/*%- else if .role %*/
WHERE role = /*% p \"role\" %*/'x'
/*%- else %*/
WHERE 1 = 0
/*%- end %*/";
    let tpl = SqlTemplate::new(DialectKind::Postgres)
        .add_func("eq_admin", |_: &[Value]| Ok(Value::Bool(false)));

    let (sql, args) = tpl.exec(s, &Params::new().with("role", "dev"))?;
    assert_eq!(sql, "SELECT * FROM users\nWHERE role = $1");
    assert_eq!(args, vec![Value::from("dev")]);

    let (sql, args) = tpl.exec(s, &Params::new())?;
    assert_eq!(sql, "SELECT * FROM users\nWHERE 1 = 0");
    assert!(args.is_empty());
    Ok(())
}

#[test]
fn templates_are_shared_across_threads() -> Result<(), SqlTemplateError> {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<SqlTemplate>();
    assert_send_sync::<Params>();
    assert_send_sync::<RenderOptions>();
    assert_send_sync::<Clock>();
    assert_send_sync::<Dialect>();

    let tpl = Arc::new(
        SqlTemplate::new(DialectKind::Postgres)
            .add_func("paging", paging)
            .with_clock(Clock::fixed(fixed_time())),
    );
    let s = "SELECT * FROM t WHERE id = /*% p \"id\" %*/0 AND at < /*% time %*/'' /*% paging 0 10 %*/";

    let workers: Vec<_> = (0..4_i64)
        .map(|i| {
            let tpl = Arc::clone(&tpl);
            std::thread::spawn(move || tpl.exec(s, &Params::new().with("id", i)))
        })
        .collect();

    for (i, worker) in (0_i64..).zip(workers) {
        let (sql, args) = worker.join().expect("render thread panicked")?;
        assert_eq!(sql, "SELECT * FROM t WHERE id = $1 AND at < $2 OFFSET 0 LIMIT 10");
        assert_eq!(args, vec![Value::Int(i), Value::Timestamp(fixed_time())]);
    }
    Ok(())
}
