use crate::github::{Comment, Issue, Label, Milestone, Project, ProjectColumn, Release, User};

pub fn user(login: &str) -> User {
    User {
        login: login.to_string(),
        name: None,
    }
}

pub fn label(name: &str) -> Label {
    Label {
        name: name.to_string(),
        color: "ededed".to_string(),
        description: None,
    }
}

pub fn milestone(number: u64, title: &str) -> Milestone {
    Milestone {
        number,
        title: title.to_string(),
        state: "open".to_string(),
        description: None,
    }
}

pub fn issue(
    number: u64,
    title: &str,
    body: Option<&str>,
    user: User,
    labels: Vec<Label>,
    milestone: Option<Milestone>,
) -> Issue {
    Issue {
        number,
        title: title.to_string(),
        body: body.map(String::from),
        html_url: format!("https://github.example.com/my_org/repo_one/issues/{number}"),
        user,
        labels,
        milestone,
    }
}

pub fn comment(body: &str, user: User) -> Comment {
    Comment {
        body: Some(body.to_string()),
        html_url: "https://github.example.com/my_org/repo_one/issues/1#issuecomment-1".to_string(),
        user,
    }
}

pub fn project(id: u64, name: &str, body: Option<&str>, creator: User) -> Project {
    Project {
        id,
        name: name.to_string(),
        body: body.map(String::from),
        html_url: format!("https://github.example.com/orgs/my_org/projects/{id}"),
        creator,
        created_at: "2023-04-01T10:00:00Z".to_string(),
    }
}

pub fn column(name: &str) -> ProjectColumn {
    ProjectColumn {
        name: name.to_string(),
    }
}

pub fn release(tag: &str, title: &str) -> Release {
    Release {
        tag_name: tag.to_string(),
        name: Some(title.to_string()),
        body: Some(format!("Notes for {title}")),
        draft: false,
        prerelease: false,
        target_commitish: "main".to_string(),
    }
}
