//! Prose manuscripts: chapters holding ordered scenes.
//!
//! Scenes may be "unfiled" (no chapter). Within every group, including the
//! unfiled one, `order_index` values form the contiguous sequence `0..n`.
//! Any move renormalizes the groups it touches.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manuscript {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synopsis: Option<String>,
    #[serde(default)]
    pub chapters: Vec<Chapter>,
    #[serde(default)]
    pub scenes: Vec<Scene>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub order_index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub content: String,
    pub order_index: usize,
    /// `None` for unfiled scenes.
    #[serde(default)]
    pub chapter_id: Option<String>,
}

impl Manuscript {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            ..Default::default()
        }
    }

    /// Append a chapter at the end of the chapter order.
    pub fn add_chapter(&mut self, id: impl Into<String>, title: impl Into<String>) -> &mut Chapter {
        let order_index = self.chapters.len();
        self.chapters.push(Chapter {
            id: id.into(),
            title: title.into(),
            summary: None,
            order_index,
        });
        &mut self.chapters[order_index]
    }

    /// Append a scene at the end of the given chapter (or the unfiled group).
    pub fn add_scene(
        &mut self,
        id: impl Into<String>,
        chapter_id: Option<&str>,
        content: impl Into<String>,
    ) -> &mut Scene {
        let chapter_id = chapter_id.map(str::to_string);
        let order_index = self
            .scenes
            .iter()
            .filter(|s| s.chapter_id == chapter_id)
            .count();
        let pos = self.scenes.len();
        self.scenes.push(Scene {
            id: id.into(),
            title: None,
            content: content.into(),
            order_index,
            chapter_id,
        });
        &mut self.scenes[pos]
    }

    /// Chapters sorted by `order_index` (stable for ties).
    pub fn chapters_in_order(&self) -> Vec<&Chapter> {
        let mut chapters: Vec<&Chapter> = self.chapters.iter().collect();
        chapters.sort_by_key(|c| c.order_index);
        chapters
    }

    /// Scenes of one group, in order. `None` selects unfiled scenes.
    pub fn scenes_in(&self, chapter_id: Option<&str>) -> Vec<&Scene> {
        self.group_positions(chapter_id)
            .into_iter()
            .map(|pos| &self.scenes[pos])
            .collect()
    }

    /// Scenes whose `chapter_id` names no existing chapter, grouped by that
    /// id in first-appearance order and ordered within each group.
    pub fn orphaned_scenes(&self) -> Vec<&Scene> {
        let mut groups: Vec<&str> = Vec::new();
        for scene in &self.scenes {
            if let Some(id) = scene.chapter_id.as_deref()
                && !self.chapters.iter().any(|c| c.id == id)
                && !groups.contains(&id)
            {
                groups.push(id);
            }
        }
        groups
            .into_iter()
            .flat_map(|id| self.scenes_in(Some(id)))
            .collect()
    }

    /// Renumber every group to `0..n`, keeping relative order.
    pub fn normalize_order(&mut self) {
        let mut groups: Vec<Option<String>> = Vec::new();
        for scene in &self.scenes {
            if !groups.contains(&scene.chapter_id) {
                groups.push(scene.chapter_id.clone());
            }
        }
        for group in groups {
            self.renumber_group(group.as_deref());
        }
    }

    /// True when every group's order indices are exactly `0..n`.
    pub fn is_normalized(&self) -> bool {
        let mut groups: Vec<Option<&str>> = Vec::new();
        for scene in &self.scenes {
            if !groups.contains(&scene.chapter_id.as_deref()) {
                groups.push(scene.chapter_id.as_deref());
            }
        }
        groups.into_iter().all(|group| {
            self.scenes_in(group)
                .iter()
                .enumerate()
                .all(|(i, s)| s.order_index == i)
        })
    }

    /// Move a scene to `target_index` within `target_chapter` (`None` for
    /// unfiled), then renormalize the source and target groups.
    ///
    /// The index is clamped to the end of the target group.
    pub fn move_scene(
        &mut self,
        scene_id: &str,
        target_chapter: Option<&str>,
        target_index: usize,
    ) -> Result<()> {
        let pos = self
            .scenes
            .iter()
            .position(|s| s.id == scene_id)
            .ok_or_else(|| Error::UnknownScene(scene_id.to_string()))?;
        if let Some(chapter) = target_chapter
            && !self.chapters.iter().any(|c| c.id == chapter)
        {
            return Err(Error::UnknownChapter(chapter.to_string()));
        }

        let source = self.scenes[pos].chapter_id.clone();
        let mut group = self.group_positions(target_chapter);
        group.retain(|&p| p != pos);
        group.insert(target_index.min(group.len()), pos);

        self.scenes[pos].chapter_id = target_chapter.map(str::to_string);
        for (i, &p) in group.iter().enumerate() {
            self.scenes[p].order_index = i;
        }

        if source.as_deref() != target_chapter {
            self.renumber_group(source.as_deref());
        }
        Ok(())
    }

    fn renumber_group(&mut self, chapter_id: Option<&str>) {
        for (i, pos) in self.group_positions(chapter_id).into_iter().enumerate() {
            self.scenes[pos].order_index = i;
        }
    }

    /// Positions in `self.scenes` of one group, sorted by order index then
    /// by position.
    fn group_positions(&self, chapter_id: Option<&str>) -> Vec<usize> {
        let mut positions: Vec<usize> = self
            .scenes
            .iter()
            .enumerate()
            .filter(|(_, s)| s.chapter_id.as_deref() == chapter_id)
            .map(|(i, _)| i)
            .collect();
        positions.sort_by_key(|&i| (self.scenes[i].order_index, i));
        positions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Manuscript {
        let mut m = Manuscript::new("m1", "The Long Winter");
        m.add_chapter("c1", "Arrival");
        m.add_chapter("c2", "Thaw");
        m.add_scene("s1", Some("c1"), "Snow fell.");
        m.add_scene("s2", Some("c1"), "The road closed.");
        m.add_scene("s3", Some("c1"), "Night came.");
        m.add_scene("s4", Some("c2"), "Water ran.");
        m.add_scene("s5", None, "A loose note.");
        m
    }

    fn ids(m: &Manuscript, chapter: Option<&str>) -> Vec<String> {
        m.scenes_in(chapter).iter().map(|s| s.id.clone()).collect()
    }

    #[test]
    fn test_move_within_chapter() {
        let mut m = sample();
        m.move_scene("s3", Some("c1"), 0).unwrap();
        assert_eq!(ids(&m, Some("c1")), vec!["s3", "s1", "s2"]);
        assert!(m.is_normalized());
    }

    #[test]
    fn test_move_across_chapters_renumbers_both() {
        let mut m = sample();
        m.move_scene("s1", Some("c2"), 1).unwrap();
        assert_eq!(ids(&m, Some("c1")), vec!["s2", "s3"]);
        assert_eq!(ids(&m, Some("c2")), vec!["s4", "s1"]);
        assert!(m.is_normalized());
    }

    #[test]
    fn test_move_to_unfiled_clamps_index() {
        let mut m = sample();
        m.move_scene("s2", None, 99).unwrap();
        assert_eq!(ids(&m, None), vec!["s5", "s2"]);
        assert_eq!(ids(&m, Some("c1")), vec!["s1", "s3"]);
        assert!(m.is_normalized());
    }

    #[test]
    fn test_move_unknown_targets() {
        let mut m = sample();
        assert!(matches!(
            m.move_scene("nope", None, 0),
            Err(Error::UnknownScene(_))
        ));
        assert!(matches!(
            m.move_scene("s1", Some("c9"), 0),
            Err(Error::UnknownChapter(_))
        ));
    }

    #[test]
    fn test_orphaned_scenes_follow_group_order() {
        let mut m = Manuscript::new("m", "Book");
        m.add_chapter("c1", "One");
        m.add_scene("s1", Some("c1"), "Kept.");
        m.add_scene("s2", Some("gone"), "Second.");
        m.add_scene("s3", Some("gone"), "Third.");
        m.scenes[1].order_index = 1;
        m.scenes[2].order_index = 0;

        let ids: Vec<&str> = m.orphaned_scenes().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["s3", "s2"]);
    }

    #[test]
    fn test_normalize_order_closes_gaps() {
        let mut m = sample();
        m.scenes[0].order_index = 4;
        m.scenes[1].order_index = 10;
        m.scenes[2].order_index = 7;
        assert!(!m.is_normalized());
        m.normalize_order();
        assert!(m.is_normalized());
        assert_eq!(ids(&m, Some("c1")), vec!["s1", "s3", "s2"]);
    }
}
