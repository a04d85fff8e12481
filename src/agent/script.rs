use serde_json::{Value, json};

use super::classify::{NEARBY_MAX_ANCESTOR_DEPTH, NEARBY_MAX_SIBLINGS, NEARBY_MIN_TEXT_LEN};
use super::strategy::CompletionRule;

/// Bumped whenever the helper's API changes so stale copies get replaced
pub const HELPER_VERSION: u32 = 3;

/// Global the helper is installed under
pub const HELPER_GLOBAL: &str = "window.__autoAccept";

/// Attribute carrying the stable element id
pub const ID_ATTRIBUTE: &str = "data-autoaccept-id";

// Installs under `window.__autoAccept`; a no-op when this version is present.
// It only answers DOM questions, decisions stay on the Rust side.
const HELPER_TEMPLATE: &str = r#"(function () {
  if (window.__autoAccept && window.__autoAccept.version === __VERSION__) {
    return 'present';
  }
  const ID_ATTR = '__ID_ATTR__';
  const OVERLAY_ID = '__autoaccept-overlay';
  // Ids from an earlier install must not collide with this one's
  const state = { nextId: 1, epoch: Date.now().toString(36) };

  function visitRoots(root, fn) {
    fn(root);
    for (const el of root.querySelectorAll('*')) {
      if (el.shadowRoot) visitRoots(el.shadowRoot, fn);
      if (el.tagName === 'IFRAME' || el.tagName === 'FRAME') {
        let doc = null;
        try { doc = el.contentDocument; } catch (e) { doc = null; }
        if (doc) visitRoots(doc, fn);
      }
    }
  }

  function queryAll(selectors) {
    const seen = new Set();
    const out = [];
    visitRoots(document, (root) => {
      for (const sel of selectors) {
        if (!sel) continue;
        let list;
        try { list = root.querySelectorAll(sel); } catch (e) { continue; }
        for (const el of list) {
          if (!seen.has(el)) { seen.add(el); out.push(el); }
        }
      }
    });
    return out;
  }

  function stamp(el) {
    let id = el.getAttribute(ID_ATTR);
    if (!id) {
      id = 'aa-' + state.epoch + '-' + state.nextId++;
      el.setAttribute(ID_ATTR, id);
    }
    return id;
  }

  function byId(id) {
    const found = queryAll(['[' + ID_ATTR + '="' + id + '"]']);
    return found.length ? found[0] : null;
  }

  function visible(el) {
    if (!el || !el.isConnected) return false;
    const view = el.ownerDocument.defaultView || window;
    const style = view.getComputedStyle(el);
    if (style.display === 'none' || style.visibility === 'hidden') return false;
    if (parseFloat(style.opacity) === 0) return false;
    const rect = el.getBoundingClientRect();
    return rect.width > 0 && rect.height > 0;
  }

  function interactable(el) {
    const view = el.ownerDocument.defaultView || window;
    if (view.getComputedStyle(el).pointerEvents === 'none') return false;
    const rect = el.getBoundingClientRect();
    const x = rect.left + rect.width / 2;
    const y = rect.top + rect.height / 2;
    const root = el.getRootNode();
    const hit = root.elementFromPoint ? root.elementFromPoint(x, y) : el.ownerDocument.elementFromPoint(x, y);
    return !!hit && (hit === el || el.contains(hit) || hit.contains(el));
  }

  function nearbyText(el) {
    let text = '';
    let node = el;
    for (let depth = 0; depth < __MAX_DEPTH__ && node; depth++) {
      let sib = node.previousElementSibling;
      for (let n = 0; sib && n < __MAX_SIBLINGS__; n++) {
        const blocks = sib.matches('pre, code') ? [sib] : Array.from(sib.querySelectorAll('pre, code'));
        for (const block of blocks) text += ' ' + (block.textContent || '');
        sib = sib.previousElementSibling;
      }
      if (text.trim().length > __MIN_TEXT__) break;
      node = node.parentElement;
    }
    return text.trim();
  }

  function label(el) {
    return (el.innerText || el.textContent || '').trim();
  }

  function scan(selectors) {
    const out = queryAll(selectors).map((el) => {
      const text = label(el);
      const isVisible = visible(el);
      return {
        id: stamp(el),
        text: text,
        ariaLabel: el.getAttribute('aria-label'),
        title: el.getAttribute('title'),
        visible: isVisible,
        interactable: isVisible && interactable(el),
        disabled: !!el.disabled || el.getAttribute('aria-disabled') === 'true',
        nearbyText: /run|execute/i.test(text) ? nearbyText(el) : null,
      };
    });
    return JSON.stringify(out);
  }

  function click(id) {
    const el = byId(id);
    if (!el) return false;
    el.click();
    const view = el.ownerDocument.defaultView || window;
    el.dispatchEvent(new view.MouseEvent('click', { bubbles: true, cancelable: true, view: view }));
    return true;
  }

  function tabs(selector) {
    return JSON.stringify(queryAll([selector]).map(label));
  }

  function focusTab(selector, index) {
    const list = queryAll([selector]);
    if (index < 0 || index >= list.length) return false;
    list[index].click();
    return true;
  }

  function isComplete(rule) {
    const present = queryAll([rule.selector]).some(visible);
    return rule.kind === 'present' ? present : !present;
  }

  function renderOverlay(overlay) {
    let box = document.getElementById(OVERLAY_ID);
    if (!box) {
      box = document.createElement('div');
      box.id = OVERLAY_ID;
      box.style.cssText = 'position:fixed;bottom:12px;right:12px;z-index:2147483647;' +
        'background:rgba(20,20,20,0.85);color:#eee;font:12px monospace;padding:6px 10px;' +
        'border-radius:6px;pointer-events:none;';
      document.body.appendChild(box);
    }
    box.textContent = '';
    overlay.tabs.forEach((tab, i) => {
      const row = document.createElement('div');
      const mark = tab.status === 'done' ? '✓' : '…';
      row.textContent = (i === overlay.active ? '▶ ' : '  ') + mark + ' ' + tab.name;
      box.appendChild(row);
    });
    return true;
  }

  function removeOverlay() {
    const box = document.getElementById(OVERLAY_ID);
    if (box) box.remove();
    return true;
  }

  window.__autoAccept = {
    version: __VERSION__,
    scan: scan,
    click: click,
    isVisible: (id) => visible(byId(id)),
    tabs: tabs,
    focusTab: focusTab,
    isComplete: isComplete,
    renderOverlay: renderOverlay,
    removeOverlay: removeOverlay,
    hasFocus: () => document.hasFocus(),
  };
  return 'installed';
})()"#;

/// The full helper source with constants filled in
pub fn helper_source() -> String {
    HELPER_TEMPLATE
        .replace("__VERSION__", &HELPER_VERSION.to_string())
        .replace("__ID_ATTR__", ID_ATTRIBUTE)
        .replace("__MAX_DEPTH__", &NEARBY_MAX_ANCESTOR_DEPTH.to_string())
        .replace("__MAX_SIBLINGS__", &NEARBY_MAX_SIBLINGS.to_string())
        .replace("__MIN_TEXT__", &NEARBY_MIN_TEXT_LEN.to_string())
}

/// Expression that is true once the current helper version is installed
pub fn presence_check() -> String {
    format!(
        "!!({global} && {global}.version === {version})",
        global = HELPER_GLOBAL,
        version = HELPER_VERSION
    )
}

/// `window.__autoAccept.<method>(<json args>)`
pub fn call(method: &str, args: &[Value]) -> String {
    let rendered: Vec<String> = args.iter().map(Value::to_string).collect();
    format!("{}.{}({})", HELPER_GLOBAL, method, rendered.join(", "))
}

/// JSON shape of a completion rule as the helper expects it
pub fn completion_arg(rule: &CompletionRule) -> Value {
    match rule {
        CompletionRule::SelectorPresent(selector) => {
            json!({ "kind": "present", "selector": selector })
        }
        CompletionRule::SelectorAbsent(selector) => {
            json!({ "kind": "absent", "selector": selector })
        }
    }
}

#[cfg(test)]
#[path = "script_test.rs"]
mod script_test;
