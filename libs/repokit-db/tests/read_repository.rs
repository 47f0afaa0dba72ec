#![allow(clippy::unwrap_used, clippy::expect_used)]

#[cfg(feature = "sqlite")]
mod common;

#[cfg(feature = "sqlite")]
mod sqlite_read_tests {
    use std::sync::Arc;

    use anyhow::Result;
    use repokit_criteria::{CriteriaError, DistinctFields, Fields, Filter, Sort, SortDir};
    use repokit_db::{ReadRepository, RepoError, SqlReadRepository, SqlRepository};

    use crate::common::{self, CustomerMapping, ids};

    const GROUP: [&str; 3] = ["2010-12-01", "2010-12-10", "2013-02-22"];

    fn filter(build: impl FnOnce(&mut Filter)) -> Filter {
        let mut filter = Filter::new();
        build(&mut filter);
        filter
    }

    async fn count_matching(repo: &SqlRepository<CustomerMapping>, filter: &Filter) -> Result<usize> {
        Ok(repo.find_by(Some(filter), None, None).await?.len())
    }

    /// Rename every customer to match customer 1 so only the identity differs.
    async fn make_lookalikes(repo: &SqlRepository<CustomerMapping>) -> Result<()> {
        let first = repo.find(&1_i64, None).await?.unwrap();
        let mut batch = Vec::new();
        for id in 1..=4_i64 {
            let mut c = first.clone();
            c.id = id;
            c.name = "Homer Simpson".to_owned();
            batch.push(c);
        }
        repo.add_all(&batch).await?;
        Ok(())
    }

    #[tokio::test]
    async fn find_returns_the_entity_under_the_identity() -> Result<()> {
        let repo = common::customers().await?;

        let found = repo.find(&4_i64, None).await?.unwrap();
        assert_eq!(found, common::seed()[3]);
        assert!(repo.find(&99_999_i64, None).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn real_columns_keep_double_precision() -> Result<()> {
        let repo = common::customers().await?;
        let precise = common::Customer::new(5, "Satoru Iwata", 7, 1_234_567.891_234_5, "2002-05-31");
        repo.add(&precise).await?;

        assert_eq!(repo.find(&5_i64, None).await?.unwrap(), precise);
        let mut expected = common::seed();
        expected.push(precise);
        let found = repo.find_by(None, Some(&Sort::new().asc("id")), None).await?;
        assert_eq!(found, expected);
        Ok(())
    }

    #[tokio::test]
    async fn projected_reads_still_hydrate_through_the_identity() -> Result<()> {
        let repo = common::customers().await?;
        let fields: Fields = std::iter::once("name").collect();

        let found = repo.find_by(None, Some(&Sort::new().asc("id")), Some(&fields)).await?;
        assert_eq!(ids(&found), [1, 2, 3, 4]);
        assert_eq!(found[3].name, "Ken Sugimori");
        // Columns left out of the projection fall back to the mapping's defaults.
        assert!(found.iter().all(|c| c.total_orders == 0 && c.date.is_empty()));

        let one = repo.find(&2_i64, Some(&fields)).await?.unwrap();
        assert_eq!((one.id, one.name.as_str()), (2, "Junichi Masuda"));
        Ok(())
    }

    #[tokio::test]
    async fn distinct_rows_without_identity_fail_to_hydrate() -> Result<()> {
        let repo = common::customers().await?;
        let distinct: DistinctFields = std::iter::once("name").collect();

        let err = repo.find_by_distinct(&distinct, None, None).await.unwrap_err();
        assert!(matches!(err, RepoError::Hydration { ref table } if table == "customers"));
        Ok(())
    }

    #[tokio::test]
    async fn find_with_fields_projects_only_those_columns() -> Result<()> {
        let db = common::customers_db().await?;
        let reader = SqlReadRepository::new(Arc::new(CustomerMapping::default()));
        let fields: Fields = ["name", "id"].into_iter().collect();

        let row = reader
            .find(&db.runner(), &2_i64, Some(&fields))
            .await?
            .unwrap();

        let columns: Vec<&str> = row.columns().collect();
        assert_eq!(columns, ["customer_id", "customer_name"]);
        assert_eq!(row.get_str("customer_name"), Some("Junichi Masuda"));
        Ok(())
    }

    #[tokio::test]
    async fn raw_reader_works_on_a_plain_connection() -> Result<()> {
        let db = common::customers_db().await?;
        let reader = SqlReadRepository::new(Arc::new(CustomerMapping::default()));
        let conn = db.conn()?;

        assert_eq!(reader.count(&conn, None).await?, 4);
        assert!(reader.exists(&conn, &3_i64).await?);
        Ok(())
    }

    #[tokio::test]
    async fn exists_agrees_with_find() -> Result<()> {
        let repo = common::customers().await?;

        assert!(repo.exists(&1_i64).await?);
        assert!(!repo.exists(&5_i64).await?);
        Ok(())
    }

    #[tokio::test]
    async fn count_with_and_without_filter() -> Result<()> {
        let repo = common::customers().await?;
        let mut filter = Filter::new();
        filter.must().contain("name", "Ken");

        assert_eq!(repo.count(None).await?, 4);
        assert_eq!(repo.count(Some(&filter)).await?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn must_conditions_narrow_the_result() -> Result<()> {
        let repo = common::customers().await?;

        let cases: Vec<(&str, Filter, usize)> = vec![
            ("range", filter(|f| { f.must().range("totalOrders", 3, 4); }), 3),
            ("not_range", filter(|f| { f.must().not_range("totalOrders", 2, 4); }), 1),
            ("equal", filter(|f| { f.must().equal("name", "Ken Sugimori"); }), 1),
            ("not_equal", filter(|f| { f.must().not_equal("name", "Ken Sugimori"); }), 3),
            ("contain", filter(|f| { f.must().contain("name", "Ken"); }), 1),
            ("not_contain", filter(|f| { f.must().not_contain("name", "Ken"); }), 3),
            ("ends_with", filter(|f| { f.must().ends_with("name", "mori"); }), 1),
            ("not_ends", filter(|f| { f.must().not_ends("name", "mori"); }), 3),
            ("starts_with", filter(|f| { f.must().starts_with("name", "Ke"); }), 1),
            ("not_starts", filter(|f| { f.must().not_starts("name", "Ke"); }), 3),
            ("less_than", filter(|f| { f.must().less_than("totalOrders", 6); }), 4),
            ("less_than_or_equal", filter(|f| { f.must().less_than_or_equal("totalOrders", 4); }), 3),
            ("greater_than", filter(|f| { f.must().greater_than("totalOrders", 2); }), 4),
            ("greater_than_or_equal", filter(|f| { f.must().greater_than_or_equal("totalOrders", 2); }), 4),
            ("group", filter(|f| { f.must().include_group("date", GROUP); }), 3),
            ("not_group", filter(|f| { f.must().not_include_group("date", GROUP); }), 1),
            ("empty", filter(|f| { f.must().empty("totalOrders"); }), 0),
            ("not_empty", filter(|f| { f.must().not_empty("totalOrders"); }), 4),
        ];

        for (label, filter, expected) in cases {
            assert_eq!(count_matching(&repo, &filter).await?, expected, "must {label}");
        }
        Ok(())
    }

    #[tokio::test]
    async fn must_not_conditions_are_complemented() -> Result<()> {
        let repo = common::customers().await?;

        let cases: Vec<(&str, Filter, usize)> = vec![
            ("equal", filter(|f| { f.must_not().equal("name", "Ken Sugimori"); }), 3),
            ("not_equal", filter(|f| { f.must_not().not_equal("name", "Ken Sugimori"); }), 1),
            ("contain", filter(|f| { f.must_not().contain("name", "Ken"); }), 3),
            ("not_contain", filter(|f| { f.must_not().not_contain("name", "Ken"); }), 1),
            ("ends_with", filter(|f| { f.must_not().ends_with("name", "mori"); }), 3),
            ("starts_with", filter(|f| { f.must_not().starts_with("name", "Ke"); }), 3),
            ("not_starts", filter(|f| { f.must_not().not_starts("name", "Ke"); }), 1),
            ("not_ends", filter(|f| { f.must_not().not_ends("name", "mori"); }), 1),
            ("less_than", filter(|f| { f.must_not().less_than("totalOrders", 2); }), 4),
            ("less_than_or_equal", filter(|f| { f.must_not().less_than_or_equal("totalOrders", 4); }), 1),
            ("greater_than", filter(|f| { f.must_not().greater_than("totalOrders", 6); }), 4),
            ("greater_than_or_equal", filter(|f| { f.must_not().greater_than_or_equal("totalOrders", 6); }), 4),
            ("group", filter(|f| { f.must_not().include_group("date", GROUP); }), 1),
            ("not_group", filter(|f| { f.must_not().not_include_group("date", GROUP); }), 3),
            ("range", filter(|f| { f.must_not().range("totalOrders", 2, 4); }), 1),
            ("not_range", filter(|f| { f.must_not().not_range("totalOrders", 2, 4); }), 3),
            ("empty", filter(|f| { f.must_not().empty("totalOrders"); }), 4),
            ("not_empty", filter(|f| { f.must_not().not_empty("totalOrders"); }), 0),
        ];

        for (label, filter, expected) in cases {
            assert_eq!(count_matching(&repo, &filter).await?, expected, "must_not {label}");
        }
        Ok(())
    }

    #[tokio::test]
    async fn negated_bound_matches_its_complement() -> Result<()> {
        let repo = common::customers().await?;

        let not_gte = filter(|f| { f.must_not().greater_than_or_equal("totalOrders", 4); });
        let lt = filter(|f| { f.must().less_than("totalOrders", 4); });
        let below = repo.find_by(Some(&not_gte), None, None).await?;
        assert_eq!(ids(&below), ids(&repo.find_by(Some(&lt), None, None).await?));
        assert_eq!(ids(&below), [1, 2]);

        let not_lt = filter(|f| { f.must_not().less_than("totalOrders", 4); });
        let gte = filter(|f| { f.must().greater_than_or_equal("totalOrders", 4); });
        let above = repo.find_by(Some(&not_lt), None, None).await?;
        assert_eq!(ids(&above), ids(&repo.find_by(Some(&gte), None, None).await?));
        assert_eq!(ids(&above), [3, 4]);
        Ok(())
    }

    #[tokio::test]
    async fn should_conditions_widen_a_failing_must() -> Result<()> {
        let repo = common::customers().await?;

        let cases: Vec<(&str, Filter, usize)> = vec![
            ("equal", filter(|f| { f.should().equal("name", "Ken Sugimori"); }), 1),
            ("contain", filter(|f| { f.should().contain("name", "Ken"); }), 1),
            ("not_contain", filter(|f| { f.should().not_contain("name", "Ken"); }), 3),
            ("ends_with", filter(|f| { f.should().ends_with("name", "mori"); }), 1),
            ("starts_with", filter(|f| { f.should().starts_with("name", "Ke"); }), 1),
            ("less_than", filter(|f| { f.should().less_than("totalOrders", 6); }), 4),
            ("less_than_or_equal", filter(|f| { f.should().less_than_or_equal("totalOrders", 4); }), 3),
            ("greater_than", filter(|f| { f.should().greater_than("totalOrders", 2); }), 4),
            ("greater_than_or_equal", filter(|f| { f.should().greater_than_or_equal("totalOrders", 2); }), 4),
            ("group", filter(|f| { f.should().include_group("date", GROUP); }), 3),
            ("not_group", filter(|f| { f.should().not_include_group("date", GROUP); }), 1),
            ("range", filter(|f| { f.should().range("totalOrders", 2, 4); }), 3),
            ("not_range", filter(|f| { f.should().not_range("totalOrders", 2, 4); }), 1),
        ];

        for (label, mut filter, expected) in cases {
            filter.must().contain("name", "Hideo Kojima");
            assert_eq!(count_matching(&repo, &filter).await?, expected, "should {label}");
        }
        Ok(())
    }

    #[tokio::test]
    async fn should_alone_is_a_disjunction() -> Result<()> {
        let repo = common::customers().await?;
        let mut filter = Filter::new();
        filter
            .should()
            .equal("name", "John Doe")
            .equal("name", "Ken Sugimori");

        let found = repo.find_by(Some(&filter), None, None).await?;
        assert_eq!(ids(&found), [1, 4]);
        Ok(())
    }

    #[tokio::test]
    async fn like_wildcards_in_values_are_literal() -> Result<()> {
        let repo = common::customers().await?;
        let mut filter = Filter::new();
        filter.must().contain("name", "%");

        assert_eq!(count_matching(&repo, &filter).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn find_by_applies_sort_in_key_order() -> Result<()> {
        let repo = common::customers().await?;
        let sort = Sort::new().desc("totalOrders").asc("name");

        let found = repo.find_by(None, Some(&sort), None).await?;
        let names: Vec<&str> = found.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            ["Shigeru Miyamoto", "Ken Sugimori", "John Doe", "Junichi Masuda"]
        );
        Ok(())
    }

    #[tokio::test]
    async fn find_by_on_an_empty_table_is_empty() -> Result<()> {
        let repo = common::customers().await?;
        repo.remove_all(None).await?;
        let mut filter = Filter::new();
        filter.must().contain("name", "Ken");

        let found = repo
            .find_by(Some(&filter), Some(&Sort::by(["name"], SortDir::Asc)), None)
            .await?;
        assert!(found.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn find_by_distinct_collapses_lookalike_rows() -> Result<()> {
        let db = common::customers_db().await?;
        let repo = SqlRepository::new(db.clone(), CustomerMapping::default())?;
        make_lookalikes(&repo).await?;

        let reader = SqlReadRepository::new(Arc::new(CustomerMapping::default()));
        let distinct: DistinctFields = ["name", "date", "totalOrders", "totalEarnings"]
            .into_iter()
            .collect();
        let rows = reader
            .find_by_distinct(
                &db.runner(),
                &distinct,
                Some(&Filter::new()),
                Some(&Sort::new().desc("name")),
            )
            .await?;

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get_str("customer_name"), Some("Homer Simpson"));
        Ok(())
    }

    #[tokio::test]
    async fn empty_distinct_fields_select_distinct_rows() -> Result<()> {
        let repo = common::customers().await?;

        let found = repo
            .find_by_distinct(&DistinctFields::new(), None, None)
            .await?;
        assert_eq!(ids(&found), [1, 2, 3, 4]);
        Ok(())
    }

    #[tokio::test]
    async fn unmapped_property_is_rejected() -> Result<()> {
        let repo = common::customers().await?;
        let mut filter = Filter::new();
        filter.must().equal("nickname", "Ken");

        let err = repo.find_by(Some(&filter), None, None).await.unwrap_err();
        assert!(matches!(
            err,
            RepoError::Criteria(CriteriaError::UnmappedProperty { ref property }) if property == "nickname"
        ));

        let err = repo
            .find_by(None, Some(&Sort::new().asc("nickname")), None)
            .await
            .unwrap_err();
        assert!(err.is_criteria());
        Ok(())
    }
}
