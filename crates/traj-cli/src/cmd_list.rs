use anyhow::bail;
use traj_core::{parse_timestamp, TrajectoryStatus};
use traj_store::{FileStorage, ListQuery, SortDirection, SortField, TrajectorySummary};

pub struct ListParams<'a> {
    pub status: Option<&'a str>,
    pub since: Option<String>,
    pub until: Option<String>,
    pub sort: &'a str,
    pub asc: bool,
    pub offset: usize,
    pub limit: Option<usize>,
    pub json: bool,
}

fn check_timestamp(flag: &str, value: Option<&str>) -> anyhow::Result<()> {
    if let Some(v) = value {
        if parse_timestamp(v).is_none() {
            bail!("--{flag} must be an RFC 3339 timestamp, got {v:?}");
        }
    }
    Ok(())
}

pub(crate) fn build_query(params: &ListParams<'_>) -> anyhow::Result<ListQuery> {
    let status = params
        .status
        .map(|s| s.parse::<TrajectoryStatus>())
        .transpose()
        .map_err(anyhow::Error::msg)?;
    let sort_by: SortField = params.sort.parse().map_err(anyhow::Error::msg)?;
    check_timestamp("since", params.since.as_deref())?;
    check_timestamp("until", params.until.as_deref())?;

    Ok(ListQuery {
        status,
        since: params.since.clone(),
        until: params.until.clone(),
        sort_by,
        direction: if params.asc {
            SortDirection::Asc
        } else {
            SortDirection::Desc
        },
        offset: params.offset,
        limit: params.limit,
    })
}

fn print_rows(rows: &[TrajectorySummary], json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(rows)?);
        return Ok(());
    }
    if rows.is_empty() {
        println!("No trajectories.");
        return Ok(());
    }
    for row in rows {
        let confidence = row
            .confidence
            .map(|c| format!(" {:.0}%", c * 100.0))
            .unwrap_or_default();
        println!(
            "{}  {:<9}  {}  {} ({} ch, {} dec{confidence})",
            row.id,
            row.status.as_str(),
            row.started_at,
            row.title,
            row.chapter_count,
            row.decision_count,
        );
    }
    Ok(())
}

pub fn list(store: &FileStorage, params: &ListParams<'_>) -> anyhow::Result<()> {
    let query = build_query(params)?;
    let rows = store.list(&query)?;
    print_rows(&rows, params.json)
}

pub fn search(store: &FileStorage, text: &str, limit: usize, json: bool) -> anyhow::Result<()> {
    let rows = store.search(text, limit)?;
    print_rows(&rows, json)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> ListParams<'static> {
        ListParams {
            status: None,
            since: None,
            until: None,
            sort: "startedAt",
            asc: false,
            offset: 0,
            limit: None,
            json: false,
        }
    }

    #[test]
    fn builds_query_from_flags() {
        let mut p = params();
        p.status = Some("completed");
        p.sort = "title";
        p.asc = true;
        p.since = Some("2026-01-01T00:00:00Z".into());
        p.limit = Some(5);
        let q = build_query(&p).unwrap();
        assert_eq!(q.status, Some(TrajectoryStatus::Completed));
        assert_eq!(q.sort_by, SortField::Title);
        assert_eq!(q.direction, SortDirection::Asc);
        assert_eq!(q.limit, Some(5));
    }

    #[test]
    fn rejects_bad_flags() {
        let mut p = params();
        p.status = Some("paused");
        assert!(build_query(&p).is_err());

        let mut p = params();
        p.sort = "size";
        assert!(build_query(&p).is_err());

        let mut p = params();
        p.until = Some("yesterday".into());
        assert!(build_query(&p).is_err());
    }
}
