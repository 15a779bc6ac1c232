use std::collections::HashSet;

use crate::api::{self, Comment, CommentId};

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum TreeError {
    #[error("comment {0} is not in this thread")]
    NotFound(CommentId),

    #[error("comment {0} is already in this thread")]
    DuplicateId(CommentId),
}

impl From<TreeError> for api::Error {
    fn from(e: TreeError) -> api::Error {
        match e {
            TreeError::NotFound(_) => api::Error::NotFound,
            TreeError::DuplicateId(id) => {
                api::Error::Unknown(format!("comment {id} received twice"))
            }
        }
    }
}

/// All the comments attached to a note, as a forest of reply trees
///
/// Comment ids are unique across all depths, and replies keep their insertion order.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Thread {
    comments: Vec<Comment>,
}

/// Builds a thread from top-level comments, refusing any id that appears twice
impl TryFrom<Vec<Comment>> for Thread {
    type Error = TreeError;

    fn try_from(comments: Vec<Comment>) -> Result<Thread, TreeError> {
        let mut seen = HashSet::new();
        if let Some((_, c)) = Walk::new(&comments, 0).find(|(_, c)| !seen.insert(c.id)) {
            return Err(TreeError::DuplicateId(c.id));
        }
        Ok(Thread { comments })
    }
}

impl Thread {
    pub fn new() -> Thread {
        Thread::default()
    }

    /// Top-level comments
    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    pub fn is_empty(&self) -> bool {
        self.comments.is_empty()
    }

    /// Number of comments at all depths
    pub fn len(&self) -> usize {
        self.walk().count()
    }

    /// Depth-first, pre-order iteration over the whole thread
    pub fn walk(&self) -> Walk<'_> {
        Walk::new(&self.comments, 0)
    }

    pub fn ids(&self) -> Vec<CommentId> {
        self.walk().map(|(_, c)| c.id).collect()
    }

    pub fn contains(&self, id: CommentId) -> bool {
        self.find_by_id(id).is_some()
    }

    pub fn find_by_id(&self, id: CommentId) -> Option<&Comment> {
        find_in(&self.comments, id)
    }

    pub fn push_top_level(&mut self, comment: Comment) -> Result<(), TreeError> {
        self.check_fresh(&comment)?;
        self.comments.push(comment);
        Ok(())
    }

    /// Appends `comment` as the last reply of `parent`
    pub fn insert_reply(&mut self, parent: CommentId, mut comment: Comment) -> Result<(), TreeError> {
        self.check_fresh(&comment)?;
        let parent_comment =
            find_in_mut(&mut self.comments, parent).ok_or(TreeError::NotFound(parent))?;
        comment.parent_comment = Some(parent);
        parent_comment.replies.push(comment);
        Ok(())
    }

    pub fn replace_content(&mut self, id: CommentId, content: String) -> Result<(), TreeError> {
        let comment = find_in_mut(&mut self.comments, id).ok_or(TreeError::NotFound(id))?;
        comment.content = content;
        comment.is_edited = true;
        Ok(())
    }

    /// Detaches the comment and all its replies, returning them
    pub fn remove_subtree(&mut self, id: CommentId) -> Result<Comment, TreeError> {
        remove_in(&mut self.comments, id).ok_or(TreeError::NotFound(id))
    }

    fn check_fresh(&self, comment: &Comment) -> Result<(), TreeError> {
        let mut seen = HashSet::new();
        let incoming = std::slice::from_ref(comment);
        match Walk::new(incoming, 0).find(|(_, c)| !seen.insert(c.id) || self.contains(c.id)) {
            Some((_, c)) => Err(TreeError::DuplicateId(c.id)),
            None => Ok(()),
        }
    }
}

fn find_in(comments: &[Comment], id: CommentId) -> Option<&Comment> {
    for c in comments {
        if c.id == id {
            return Some(c);
        }
        if let Some(res) = find_in(&c.replies, id) {
            return Some(res);
        }
    }
    None
}

fn find_in_mut(comments: &mut [Comment], id: CommentId) -> Option<&mut Comment> {
    for c in comments.iter_mut() {
        if c.id == id {
            return Some(c);
        }
        if let Some(res) = find_in_mut(&mut c.replies, id) {
            return Some(res);
        }
    }
    None
}

fn remove_in(comments: &mut Vec<Comment>, id: CommentId) -> Option<Comment> {
    if let Some(pos) = comments.iter().position(|c| c.id == id) {
        return Some(comments.remove(pos));
    }
    comments
        .iter_mut()
        .find_map(|c| remove_in(&mut c.replies, id))
}

pub struct Walk<'a> {
    // (depth, comment), next to visit on top
    stack: Vec<(usize, &'a Comment)>,
}

impl<'a> Walk<'a> {
    fn new(comments: &'a [Comment], depth: usize) -> Walk<'a> {
        Walk {
            stack: comments.iter().rev().map(|c| (depth, c)).collect(),
        }
    }
}

impl<'a> Iterator for Walk<'a> {
    type Item = (usize, &'a Comment);

    fn next(&mut self) -> Option<Self::Item> {
        let (depth, c) = self.stack.pop()?;
        self.stack
            .extend(c.replies.iter().rev().map(|r| (depth + 1, r)));
        Some((depth, c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{comment, thread_from_shape, thread_of};

    #[test]
    fn scenario_reply_to_root() {
        let mut t = thread_of(vec![comment(1, "Hello")]);
        t.insert_reply(CommentId(1), comment(2, "Hi")).unwrap();
        let root = t.find_by_id(CommentId(1)).unwrap();
        assert_eq!(root.content, "Hello");
        assert_eq!(root.replies.len(), 1);
        assert_eq!(root.replies[0].id, CommentId(2));
        assert_eq!(root.replies[0].content, "Hi");
        assert_eq!(root.replies[0].parent_comment, Some(CommentId(1)));
    }

    #[test]
    fn scenario_delete_cascades() {
        let mut t = thread_of(vec![comment(1, "root")]);
        t.insert_reply(CommentId(1), comment(2, "child")).unwrap();
        t.insert_reply(CommentId(2), comment(3, "grandchild")).unwrap();
        let removed = t.remove_subtree(CommentId(2)).unwrap();
        assert_eq!(removed.replies[0].id, CommentId(3));
        assert!(t.find_by_id(CommentId(2)).is_none());
        assert!(t.find_by_id(CommentId(3)).is_none());
        assert_eq!(t.ids(), vec![CommentId(1)]);
    }

    #[test]
    fn missing_targets_are_reported() {
        let mut t = thread_of(vec![comment(1, "root")]);
        assert_eq!(
            t.insert_reply(CommentId(7), comment(2, "x")),
            Err(TreeError::NotFound(CommentId(7)))
        );
        assert_eq!(
            t.replace_content(CommentId(7), String::from("x")),
            Err(TreeError::NotFound(CommentId(7)))
        );
        assert_eq!(
            t.remove_subtree(CommentId(7)),
            Err(TreeError::NotFound(CommentId(7)))
        );
        assert_eq!(t, thread_of(vec![comment(1, "root")]));
    }

    #[test]
    fn duplicate_ids_are_refused() {
        let mut t = thread_of(vec![comment(1, "root")]);
        t.insert_reply(CommentId(1), comment(2, "child")).unwrap();
        assert_eq!(
            t.insert_reply(CommentId(1), comment(2, "again")),
            Err(TreeError::DuplicateId(CommentId(2)))
        );
        let mut nested = comment(5, "new");
        nested.replies.push(comment(1, "clash"));
        assert_eq!(
            t.push_top_level(nested),
            Err(TreeError::DuplicateId(CommentId(1)))
        );
        assert_eq!(t.len(), 2);
    }

    #[test]
    fn fetched_duplicates_are_refused() {
        let mut root = comment(1, "root");
        root.replies.push(comment(2, "child"));
        assert_eq!(
            Thread::try_from(vec![root.clone(), comment(2, "clash")]),
            Err(TreeError::DuplicateId(CommentId(2)))
        );
        let mut twice = comment(3, "parent");
        twice.replies.push(comment(4, "a"));
        twice.replies.push(comment(4, "b"));
        assert_eq!(
            Thread::try_from(vec![twice.clone()]),
            Err(TreeError::DuplicateId(CommentId(4)))
        );
        let mut t = Thread::try_from(vec![root]).unwrap();
        assert_eq!(
            t.push_top_level(twice),
            Err(TreeError::DuplicateId(CommentId(4)))
        );
        assert_eq!(t.len(), 2);
    }

    #[test]
    fn walk_is_depth_first_in_insertion_order() {
        let mut t = thread_of(vec![comment(1, "a"), comment(4, "d")]);
        t.insert_reply(CommentId(1), comment(2, "b")).unwrap();
        t.insert_reply(CommentId(2), comment(3, "c")).unwrap();
        t.insert_reply(CommentId(1), comment(5, "e")).unwrap();
        let walked = t
            .walk()
            .map(|(d, c)| (d, c.id.0))
            .collect::<Vec<_>>();
        assert_eq!(walked, vec![(0, 1), (1, 2), (2, 3), (1, 5), (0, 4)]);
    }

    #[test]
    fn unknown_ids_are_not_found() {
        bolero::check!()
            .with_type::<(Vec<u8>, u16)>()
            .cloned()
            .for_each(|(shape, extra)| {
                let t = thread_from_shape(&shape);
                let id = CommentId(shape.len() as i64 + 1 + extra as i64);
                assert!(t.find_by_id(id).is_none());
            });
    }

    #[test]
    fn inserted_reply_is_found_last_among_siblings() {
        bolero::check!()
            .with_type::<(Vec<u8>, u8)>()
            .cloned()
            .for_each(|(shape, pick)| {
                let mut t = thread_from_shape(&shape);
                if t.is_empty() {
                    return;
                }
                let ids = t.ids();
                let parent = ids[pick as usize % ids.len()];
                let new_id = shape.len() as i64 + 1;
                let new = comment(new_id, "new reply");
                t.insert_reply(parent, new.clone()).unwrap();
                let mut expected = new;
                expected.parent_comment = Some(parent);
                assert_eq!(t.find_by_id(CommentId(new_id)), Some(&expected));
                let p = t.find_by_id(parent).unwrap();
                assert_eq!(p.replies.last(), Some(&expected));
                assert_eq!(t.len(), ids.len() + 1);
            });
    }

    #[test]
    fn removed_subtree_is_entirely_gone() {
        bolero::check!()
            .with_type::<(Vec<u8>, u8)>()
            .cloned()
            .for_each(|(shape, pick)| {
                let mut t = thread_from_shape(&shape);
                if t.is_empty() {
                    return;
                }
                let ids = t.ids();
                let target = ids[pick as usize % ids.len()];
                let descendants = thread_of(vec![t.find_by_id(target).unwrap().clone()]).ids();
                t.remove_subtree(target).unwrap();
                for id in &descendants {
                    assert!(t.find_by_id(*id).is_none(), "{id} survived removal of {target}");
                }
                for id in ids.iter().filter(|id| !descendants.contains(id)) {
                    assert!(t.find_by_id(*id).is_some(), "{id} lost by removal of {target}");
                }
            });
    }

    #[test]
    fn edited_flag_is_sticky() {
        bolero::check!()
            .with_type::<(Vec<u8>, u8, u8)>()
            .cloned()
            .for_each(|(shape, first, second)| {
                let mut t = thread_from_shape(&shape);
                if t.is_empty() {
                    return;
                }
                let ids = t.ids();
                let a = ids[first as usize % ids.len()];
                let b = ids[second as usize % ids.len()];
                t.replace_content(a, String::from("edited once")).unwrap();
                assert!(t.find_by_id(a).unwrap().is_edited);
                t.replace_content(b, String::from("edited twice")).unwrap();
                assert!(t.find_by_id(a).unwrap().is_edited);
                assert!(t.find_by_id(b).unwrap().is_edited);
                assert_eq!(t.find_by_id(b).unwrap().content, "edited twice");
                for id in ids.iter().filter(|id| **id != a && **id != b) {
                    assert!(!t.find_by_id(*id).unwrap().is_edited);
                }
            });
    }
}
