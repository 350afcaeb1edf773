use super::domain::{Section, SectionId};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SectionOrderError {
    #[error("section {0} not found")]
    UnknownSection(SectionId),
    #[error("position {position} outside 1..={len}")]
    PositionOutOfRange { position: u32, len: usize },
}

/// Moves a section to `new_order` (1-based), shifting every section between the
/// old and new position by one. Orders are rewritten to `1..=n` afterwards.
pub fn reorder_section(
    sections: &mut Vec<Section>,
    section_id: &SectionId,
    new_order: u32,
) -> Result<(), SectionOrderError> {
    if new_order == 0 || new_order as usize > sections.len() {
        return Err(SectionOrderError::PositionOutOfRange {
            position: new_order,
            len: sections.len(),
        });
    }

    sections.sort_by(|left, right| left.order.cmp(&right.order).then(left.id.cmp(&right.id)));
    let current = sections
        .iter()
        .position(|section| &section.id == section_id)
        .ok_or_else(|| SectionOrderError::UnknownSection(section_id.clone()))?;

    let moved = sections.remove(current);
    sections.insert(new_order as usize - 1, moved);
    renumber(sections);
    Ok(())
}

/// Removes a section and closes the gap it leaves behind.
pub fn remove_section(
    sections: &mut Vec<Section>,
    section_id: &SectionId,
) -> Result<Section, SectionOrderError> {
    let index = sections
        .iter()
        .position(|section| &section.id == section_id)
        .ok_or_else(|| SectionOrderError::UnknownSection(section_id.clone()))?;
    let removed = sections.remove(index);
    sections.sort_by(|left, right| left.order.cmp(&right.order).then(left.id.cmp(&right.id)));
    renumber(sections);
    Ok(removed)
}

fn renumber(sections: &mut [Section]) {
    for (index, section) in sections.iter_mut().enumerate() {
        section.order = index as u32 + 1;
    }
}
