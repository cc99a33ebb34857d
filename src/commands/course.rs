//! Session commands for browsing and enrolling in courses.

use std::fmt::Write as _;

use crate::enroll::Enrollment;
use crate::error::Error;
use crate::model::CourseId;
use crate::session::SessionContext;
use crate::Result;

use super::CommandTable;

/// How many catalog matches a search may return.
const SEARCH_LIMIT: usize = 10;

/// Command set for course-edit sessions.
pub fn course_commands() -> CommandTable<SessionContext> {
    let mut table = CommandTable::new();
    table.register("search", cmd_search);
    table.register("join", cmd_join);
    table.register("leave", cmd_leave);
    table.register("list", cmd_list);
    table
}

/// Command set for admin sessions.
pub fn admin_commands() -> CommandTable<SessionContext> {
    CommandTable::new()
}

fn parse_course_id(args: &[String]) -> Result<CourseId> {
    let raw = args
        .first()
        .ok_or_else(|| Error::InvalidArguments("please enter a course id".to_string()))?;
    raw.parse::<i64>()
        .map(CourseId)
        .map_err(|_| Error::InvalidArguments(format!("{raw} is not a course id")))
}

async fn cmd_search(ctx: SessionContext, args: Vec<String>) -> Result<()> {
    if args.is_empty() {
        return ctx.print("Please enter a search term.").await;
    }
    let query = args.join(" ");

    let catalog = ctx.store.course_catalog().await?;
    let matches = ctx.index.search(&catalog, &query, SEARCH_LIMIT);
    if matches.is_empty() {
        return ctx.print(&format!("No results for **{query}**")).await;
    }

    let mut response = format!("Search results for **{query}**\n");
    response.push_str("```[ -ID-] | Course (majors)\n");
    for hit in &matches {
        let _ = writeln!(response, "[{:>5}] | {} ({})", hit.id, hit.name, hit.majors.join(", "));
    }
    response.push_str("```");
    ctx.print(&response).await
}

async fn cmd_join(ctx: SessionContext, args: Vec<String>) -> Result<()> {
    let id = parse_course_id(&args)?;

    let Some(course) = ctx.store.find_course(id).await? else {
        return ctx.print(&format!("{id} was not found")).await;
    };

    let Some(guild) = ctx.origin.as_ref() else {
        return Err(Error::Execution("join requires a guild-spawned session".to_string()));
    };

    let enrollment = Enrollment::new(ctx.store.as_ref(), ctx.chat.as_ref(), guild);
    match enrollment.join_course(&course, &ctx.message.author).await {
        Ok(_) => {
            ctx.print(&format!("**{}** was added to your courses.", course.name))
                .await
        }
        Err(Error::AlreadyJoined) => {
            ctx.print("You are already enrolled in that course.").await
        }
        Err(err) => Err(err),
    }
}

async fn cmd_leave(ctx: SessionContext, args: Vec<String>) -> Result<()> {
    let id = parse_course_id(&args)?;

    let Some(course) = ctx.store.find_course(id).await? else {
        return ctx.print(&format!("{id} was not found")).await;
    };

    let Some(guild) = ctx.origin.as_ref() else {
        return Err(Error::Execution("leave requires a guild-spawned session".to_string()));
    };

    let enrollment = Enrollment::new(ctx.store.as_ref(), ctx.chat.as_ref(), guild);
    match enrollment.leave_course(&course, &ctx.message.author).await {
        Ok(()) => {
            ctx.print(&format!("**{}** was removed from your courses.", course.name))
                .await
        }
        Err(Error::NotJoined) => {
            ctx.print("You cannot leave a course you never enrolled in.").await
        }
        Err(err) => Err(err),
    }
}

async fn cmd_list(ctx: SessionContext, _args: Vec<String>) -> Result<()> {
    let courses = ctx.store.courses_of(&ctx.message.author).await?;
    if courses.is_empty() {
        return ctx.print("No courses found.").await;
    }

    let mut response = String::from("Your courses:\n```");
    for course in &courses {
        let _ = writeln!(response, "[{:>5}] | {}", course.id, course.name);
    }
    response.push_str("```");
    ctx.print(&response).await
}
